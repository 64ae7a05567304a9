//! Strudel Sync Core - change-detecting persistence for Strudel user patterns.
//!
//! The browser keeps every user pattern in `localStorage`; this crate turns a
//! snapshot of those patterns into one file per pattern on disk, writing only
//! the patterns whose content actually changed. It has no HTTP layer; see the
//! `strudel-sync-server` crate for the transport.
//!
//! # Example
//!
//! ```rust,ignore
//! use strudel_sync_core::{EngineConfig, PersistenceEngine, Snapshot};
//!
//! #[tokio::main]
//! async fn main() -> strudel_sync_core::Result<()> {
//!     let engine = PersistenceEngine::from_config(&EngineConfig::new("./patterns"));
//!
//!     let snapshot = Snapshot::new().with("drums", "s(\"bd sd\")");
//!     let result = engine.apply_snapshot(&snapshot).await?;
//!     println!("{} of {} patterns written", result.written, result.count);
//!
//!     // Same content again: nothing to write.
//!     assert_eq!(engine.apply_snapshot(&snapshot).await?.written, 0);
//!     Ok(())
//! }
//! ```

pub mod baseline;
pub mod config;
pub mod engine;
pub mod error;
pub mod identifier;
pub mod notifier;
pub mod snapshot;
pub mod storage;

pub use baseline::{Baseline, BaselineCache};
pub use config::{EngineConfig, NotifierConfig, SyncConfig};
pub use engine::{PersistenceEngine, SyncOutcome, SyncResult};
pub use error::{Result, SyncError};
pub use identifier::PatternId;
pub use notifier::{ChangeNotifier, FlushReport, SnapshotSink};
pub use snapshot::{PatternEntry, Snapshot};
pub use storage::{FsPatternStore, MemoryPatternStore, PatternStore};
