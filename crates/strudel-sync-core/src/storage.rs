//! Durable pattern storage.
//!
//! [`FsPatternStore`] keeps one plain-text record per pattern and replaces
//! records atomically:
//! 1. Write to a uniquely named temp file next to the target
//! 2. `sync_all` so the data reaches disk
//! 3. Rename over the target
//!
//! A reader therefore sees either the old content or the new content, never a
//! truncated record. [`MemoryPatternStore`] is the in-process counterpart.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::identifier::PatternId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

/// Storage keyed by pattern identifier.
///
/// Writes replace the whole record. Backends report raw I/O errors; the
/// engine decides whether a failure is fatal.
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// Create the storage location if it does not exist yet.
    async fn ensure_root(&self) -> Result<()>;

    /// Current content of a record, or `None` if there is no record.
    async fn read(&self, id: &PatternId) -> io::Result<Option<String>>;

    /// Replace a record's content in full.
    async fn write(&self, id: &PatternId, content: &str) -> io::Result<()>;

    /// Where a record lives, for error context. `None` for non-file backends.
    fn record_path(&self, _id: &PatternId) -> Option<PathBuf> {
        None
    }

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// One `<id><suffix>` file per pattern inside `root`.
#[derive(Debug, Clone)]
pub struct FsPatternStore {
    root: PathBuf,
    suffix: String,
}

impl FsPatternStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_suffix(root, SyncConfig::RECORD_SUFFIX)
    }

    pub fn with_suffix(root: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            suffix: suffix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &PatternId) -> PathBuf {
        self.root.join(id.file_name(&self.suffix))
    }

    fn temp_path_for(&self, id: &PatternId) -> PathBuf {
        // Leading dot plus trailing `.tmp` keeps temp files from ever
        // matching a `<id><suffix>` record name.
        self.root.join(format!(
            ".{}.{}{}",
            id.file_name(&self.suffix),
            Uuid::new_v4().simple(),
            SyncConfig::TEMP_SUFFIX
        ))
    }
}

#[async_trait]
impl PatternStore for FsPatternStore {
    async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| SyncError::io_with_path(e, &self.root))
    }

    async fn read(&self, id: &PatternId) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(id)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, id: &PatternId, content: &str) -> io::Result<()> {
        let path = self.path_for(id);
        let temp_path = self.temp_path_for(id);

        if let Err(e) = write_then_rename(&temp_path, &path, content).await {
            // The target was never touched; only the temp file can be left over.
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        debug!("Atomically wrote {}", path.display());
        Ok(())
    }

    fn record_path(&self, id: &PatternId) -> Option<PathBuf> {
        Some(self.path_for(id))
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

async fn write_then_rename(temp_path: &Path, path: &Path, content: &str) -> io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(temp_path, path).await
}

/// Patterns held in memory.
#[derive(Debug, Default)]
pub struct MemoryPatternStore {
    records: Mutex<HashMap<String, String>>,
    writes: Mutex<usize>,
}

impl MemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record without counting it as a write.
    pub fn insert(&self, id: impl Into<String>, content: impl Into<String>) {
        self.records
            .lock()
            .expect("memory store lock poisoned")
            .insert(id.into(), content.into());
    }

    pub fn get(&self, id: &str) -> Option<String> {
        self.records
            .lock()
            .expect("memory store lock poisoned")
            .get(id)
            .cloned()
    }

    /// Number of writes performed through [`PatternStore::write`].
    pub fn write_count(&self) -> usize {
        *self.writes.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl PatternStore for MemoryPatternStore {
    async fn ensure_root(&self) -> Result<()> {
        Ok(())
    }

    async fn read(&self, id: &PatternId) -> io::Result<Option<String>> {
        Ok(self.get(id.as_str()))
    }

    async fn write(&self, id: &PatternId, content: &str) -> io::Result<()> {
        self.insert(id.as_str(), content);
        *self.writes.lock().expect("memory store lock poisoned") += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
