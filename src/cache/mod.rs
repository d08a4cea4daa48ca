//! Two-tier cache store for the stats snapshot
//!
//! ```text
//! read()  → memory tier (always consulted first, zero I/O)
//!               ↓ empty
//!           durable tier (JSON file; seeds the memory tier)
//!               ↓ missing / corrupt / unreadable
//!           None — absence is always recoverable by a fresh fetch
//! ```
//!
//! Writes are asymmetric: the memory tier is updated synchronously and is
//! authoritative; a durable-tier failure is logged and does not fail the
//! write. Reads never propagate durable-tier errors at all. The memory
//! lock is never held across durable I/O.

pub mod ttl;

use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::CacheError;
use crate::stats::{CacheEntry, DurableRecord};

/// Single-entry store: fast in-process tier backed by one JSON record
#[derive(Debug)]
pub struct CacheStore {
    memory: RwLock<Option<CacheEntry>>,
    path: PathBuf,
}

impl CacheStore {
    /// Create a store persisting at `path`. Nothing is touched on disk
    /// until the first read or write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            memory: RwLock::new(None),
            path: path.into(),
        }
    }

    /// Durable tier location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the latest entry.
    ///
    /// Memory tier first; on miss, attempt to seed from the durable tier.
    /// Any durable-tier failure (missing file, corrupt record, unreadable
    /// path) is a cache miss, never an error.
    pub async fn read(&self) -> Option<CacheEntry> {
        if let Some(entry) = *self.memory.read().await {
            return Some(entry);
        }

        match self.load_durable().await {
            Ok(entry) => {
                let mut guard = self.memory.write().await;
                // A concurrent write may have landed while we read disk;
                // the fresher in-memory value wins.
                if guard.is_none() {
                    info!(
                        "seeded memory tier from durable cache at {}",
                        self.path.display()
                    );
                    *guard = Some(entry);
                }
                *guard
            }
            Err(e) => {
                debug!("durable tier unavailable, treating as cache miss: {}", e);
                None
            }
        }
    }

    /// Write a new entry.
    ///
    /// The memory tier is updated first and unconditionally; durable
    /// persistence failure is logged but does not fail the write, so the
    /// fast path keeps working on a read-only filesystem.
    pub async fn write(&self, entry: CacheEntry) {
        {
            *self.memory.write().await = Some(entry);
        }

        if let Err(e) = self.persist(entry).await {
            warn!(
                "durable tier write to {} failed (memory tier still updated): {}",
                self.path.display(),
                e
            );
        }
    }

    async fn load_durable(&self) -> Result<CacheEntry, CacheError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let record: DurableRecord = serde_json::from_slice(&bytes)?;
        Ok(CacheEntry::new(record.into()))
    }

    async fn persist(&self, entry: CacheEntry) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let record = DurableRecord::from(entry.stats);
        let json = serde_json::to_vec(&record)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
