//! Pattern persistence engine.
//!
//! Given a snapshot, writes only the patterns whose content differs from the
//! baseline cache. The first time an identifier is seen its baseline is read
//! from storage, so a restarted process does not rewrite records that already
//! hold the submitted content. After that the cache is trusted and storage is
//! not read again for that identifier.

use crate::baseline::{Baseline, BaselineCache, SlotGuard};
use crate::config::EngineConfig;
use crate::error::{Result, SyncError};
use crate::identifier::PatternId;
use crate::snapshot::Snapshot;
use crate::storage::{FsPatternStore, PatternStore};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Counts reported for an applied snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    /// Entries in the snapshot.
    pub count: usize,
    /// Entries actually written to storage.
    pub written: usize,
}

/// Result of handing a raw payload to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A snapshot was found and applied.
    Applied(SyncResult),
    /// The payload held no recognizable snapshot.
    NothingToSync,
}

/// Change-detecting writer shared by every sync request.
pub struct PersistenceEngine {
    store: Arc<dyn PatternStore>,
    cache: BaselineCache,
    io_timeout: Option<Duration>,
}

impl PersistenceEngine {
    /// Create an engine with an empty baseline cache.
    pub fn new(store: Arc<dyn PatternStore>) -> Self {
        Self {
            store,
            cache: BaselineCache::new(),
            io_timeout: None,
        }
    }

    /// Filesystem-backed engine for `config.data_dir`.
    pub fn from_config(config: &EngineConfig) -> Self {
        let store = FsPatternStore::with_suffix(config.data_dir.clone(), config.suffix.clone());
        let mut engine = Self::new(Arc::new(store));
        engine.io_timeout = config.io_timeout;
        engine
    }

    /// Bound how long a call waits on each storage read and write.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &Arc<dyn PatternStore> {
        &self.store
    }

    /// Resolved baseline for `id`; `None` if the engine has not resolved it yet.
    pub async fn baseline(&self, id: &str) -> Option<Baseline> {
        self.cache.get(id).await
    }

    /// Number of identifiers the cache has seen.
    pub fn tracked(&self) -> usize {
        self.cache.len()
    }

    /// Extract a snapshot from `payload` and apply it.
    pub async fn apply_payload(&self, payload: &Value) -> Result<SyncOutcome> {
        match Snapshot::from_payload(payload)? {
            Some(snapshot) => Ok(SyncOutcome::Applied(self.apply_snapshot(&snapshot).await?)),
            None => Ok(SyncOutcome::NothingToSync),
        }
    }

    /// Persist every entry whose content changed.
    ///
    /// All identifiers are validated before any I/O; one bad identifier
    /// rejects the whole call. A write failure stops the call at that entry:
    /// entries written before it stay written and cached, later ones are not
    /// attempted.
    pub async fn apply_snapshot(&self, snapshot: &Snapshot) -> Result<SyncResult> {
        let mut entries = Vec::with_capacity(snapshot.len());
        for (raw, entry) in snapshot.iter() {
            entries.push((PatternId::parse(raw)?, entry.code.as_str()));
        }

        self.store.ensure_root().await?;

        let mut written = 0;
        for (id, content) in &entries {
            if self.sync_entry(id, content).await? {
                written += 1;
            }
        }

        let result = SyncResult {
            count: entries.len(),
            written,
        };
        debug!(
            "Synced {} patterns to {} ({} written)",
            result.count,
            self.store.describe(),
            result.written
        );
        Ok(result)
    }

    /// Resolve, compare and maybe write one entry. Returns whether it wrote.
    async fn sync_entry(&self, id: &PatternId, content: &str) -> Result<bool> {
        let mut slot = self.cache.lock(id).await;

        if slot.is_none() {
            *slot = Some(self.resolve(id).await);
        }

        if slot.as_ref().is_some_and(|baseline| baseline.matches(content)) {
            debug!("Pattern {} unchanged", id);
            return Ok(false);
        }

        self.write_entry(id, content, slot).await?;
        info!("Pattern {} updated", id);
        Ok(true)
    }

    /// Write one entry and record it in the slot.
    ///
    /// The write and the cache update run as one task that owns the slot
    /// guard. A deadline or a dropped caller only stops the waiting: the task
    /// still finishes, cleans up its temp file and records what landed, and
    /// the identifier stays locked until it does.
    async fn write_entry(
        &self,
        id: &PatternId,
        content: &str,
        mut slot: SlotGuard,
    ) -> Result<()> {
        let mut write = {
            let store = self.store.clone();
            let id = id.clone();
            let content = content.to_string();
            tokio::spawn(async move {
                store.write(&id, &content).await?;
                *slot = Some(Baseline::Present(content));
                Ok::<_, io::Error>(())
            })
        };

        let joined = match self.io_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut write).await {
                Ok(joined) => joined,
                Err(_) => return Err(SyncError::Timeout(limit)),
            },
            None => write.await,
        };

        joined
            .map_err(io::Error::other)
            .and_then(|written| written)
            .map_err(|source| SyncError::StorageWrite {
                id: id.to_string(),
                path: self.store.record_path(id),
                source,
            })
    }

    /// Read the stored record once. Any failure counts as "no prior record".
    async fn resolve(&self, id: &PatternId) -> Baseline {
        match self.bounded_read(self.store.read(id)).await {
            Ok(Ok(Some(content))) => {
                debug!("Baseline for {} loaded from storage", id);
                Baseline::Present(content)
            }
            Ok(Ok(None)) => Baseline::Absent,
            Ok(Err(e)) => {
                warn!("Could not read stored pattern {}: {}", id, e);
                Baseline::Absent
            }
            Err(limit) => {
                warn!("Reading stored pattern {} timed out after {:?}", id, limit);
                Baseline::Absent
            }
        }
    }

    /// Apply the configured I/O deadline to a read. `Err` carries the limit.
    async fn bounded_read<T>(
        &self,
        op: impl Future<Output = io::Result<T>>,
    ) -> std::result::Result<io::Result<T>, Duration> {
        match self.io_timeout {
            Some(limit) => tokio::time::timeout(limit, op).await.map_err(|_| limit),
            None => Ok(op.await),
        }
    }
}
