//! Debounced change notifier.
//!
//! Batches a burst of snapshot updates into a single delivery: each
//! [`ChangeNotifier::notify`] replaces the pending snapshot and restarts the
//! quiet period, and only when the quiet period passes without another
//! notification is the latest snapshot handed to the sink. This is the same
//! trailing-edge policy the browser client applies before posting.
//!
//! Failed deliveries are reported, never retried here.

use crate::config::NotifierConfig;
use crate::engine::{PersistenceEngine, SyncResult};
use crate::error::Result;
use crate::snapshot::Snapshot;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Receiver of debounced snapshots.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn deliver(&self, snapshot: Snapshot) -> Result<SyncResult>;
}

#[async_trait]
impl SnapshotSink for PersistenceEngine {
    async fn deliver(&self, snapshot: Snapshot) -> Result<SyncResult> {
        self.apply_snapshot(&snapshot).await
    }
}

/// What happened to one flushed snapshot.
#[derive(Debug)]
pub struct FlushReport {
    /// Entries in the delivered snapshot.
    pub entries: usize,
    /// Notifications folded into this delivery.
    pub coalesced: usize,
    pub result: Result<SyncResult>,
}

/// Handle to a running debounce worker.
///
/// Dropping the handle (or calling [`shutdown`](Self::shutdown)) flushes any
/// pending snapshot before the worker exits.
pub struct ChangeNotifier {
    tx: mpsc::UnboundedSender<Snapshot>,
    worker: JoinHandle<()>,
}

impl ChangeNotifier {
    /// Start the worker. Reports for each delivery arrive on the returned receiver.
    pub fn spawn(
        sink: Arc<dyn SnapshotSink>,
        config: NotifierConfig,
    ) -> (Self, mpsc::UnboundedReceiver<FlushReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run(sink, config.quiet_period, rx, report_tx));
        (Self { tx, worker }, report_rx)
    }

    /// Record a new snapshot. Returns `false` if the worker is gone.
    pub fn notify(&self, snapshot: Snapshot) -> bool {
        self.tx.send(snapshot).is_ok()
    }

    /// Flush anything pending and wait for the worker to finish.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            warn!("Change notifier worker failed: {}", e);
        }
    }
}

async fn run(
    sink: Arc<dyn SnapshotSink>,
    quiet_period: Duration,
    mut rx: mpsc::UnboundedReceiver<Snapshot>,
    reports: mpsc::UnboundedSender<FlushReport>,
) {
    while let Some(first) = rx.recv().await {
        let mut pending = first;
        let mut coalesced = 1;
        let mut closed = false;

        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(snapshot) => {
                        pending = snapshot;
                        coalesced += 1;
                    }
                    None => {
                        closed = true;
                        break;
                    }
                },
                _ = tokio::time::sleep(quiet_period) => break,
            }
        }

        let entries = pending.len();
        debug!(
            "Flushing snapshot with {} patterns ({} notifications)",
            entries, coalesced
        );
        let result = sink.deliver(pending).await;
        if let Err(e) = &result {
            warn!("Snapshot delivery failed: {}", e);
        }
        // Nobody listening for reports is fine.
        let _ = reports.send(FlushReport {
            entries,
            coalesced,
            result,
        });

        if closed {
            break;
        }
    }
    debug!("Change notifier stopped");
}
