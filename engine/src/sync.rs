//! Best-effort forwarding of manual reorders to a persistence collaborator.
//!
//! A submitted move runs on a small rayon pool owned by the sync; the caller
//! never waits for it. There are no retries and superseded moves are not
//! cancelled. Failures are logged and kept in a ledger, and the local
//! reorder that triggered the move is never rolled back. Moves submitted
//! back to back may reach the collaborator in either order.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;
use tracing::{debug, warn};

use crate::roster::EncounterId;

/// A committed manual-order move, as emitted by the drag source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderMove {
    pub encounter: EncounterId,
    pub from: usize,
    pub to: usize,
}

/// Errors reported by a persistence collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("reorder rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("reorder transport failed: {0}")]
    Transport(String),
}

/// Error starting the sync worker pool.
#[derive(Debug, Error)]
#[error("failed to start reorder sync workers: {0}")]
pub struct SyncStartError(#[from] ThreadPoolBuildError);

/// Something that can persist a manual-order move.
pub trait ReorderSink: Send + Sync {
    fn persist(&self, mv: &ReorderMove) -> Result<(), SyncError>;
}

/// A move that the collaborator failed to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub mv: ReorderMove,
    pub error: SyncError,
}

#[derive(Debug, Default)]
struct Ledger {
    issued: u64,
    settled: u64,
    failures: Vec<SyncFailure>,
}

#[derive(Debug, Default)]
struct Shared {
    ledger: Mutex<Ledger>,
    settled: Condvar,
}

/// Detached forwarder of reorder moves.
#[derive(Clone)]
pub struct ReorderSync {
    sink: Arc<dyn ReorderSink>,
    pool: Arc<ThreadPool>,
    shared: Arc<Shared>,
}

impl ReorderSync {
    /// Starts a sync with `threads` workers (at least one).
    pub fn new(sink: Arc<dyn ReorderSink>, threads: usize) -> Result<Self, SyncStartError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("reorder-sync-{i}"))
            .build()?;
        Ok(ReorderSync {
            sink,
            pool: Arc::new(pool),
            shared: Arc::new(Shared::default()),
        })
    }

    /// Hands `mv` to the collaborator without waiting for the outcome.
    pub fn submit(&self, mv: ReorderMove) {
        self.shared.ledger.lock().issued += 1;
        let sink = Arc::clone(&self.sink);
        let shared = Arc::clone(&self.shared);
        debug!(encounter = %mv.encounter, from = mv.from, to = mv.to, "reorder_sync_submitted");
        self.pool.spawn(move || {
            let outcome = sink.persist(&mv);
            let mut ledger = shared.ledger.lock();
            if let Err(error) = outcome {
                warn!(
                    encounter = %mv.encounter,
                    from = mv.from,
                    to = mv.to,
                    error = %error,
                    "reorder_sync_failed"
                );
                ledger.failures.push(SyncFailure { mv, error });
            }
            ledger.settled += 1;
            drop(ledger);
            shared.settled.notify_all();
        });
    }

    /// Worker threads of the pool.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Moves submitted but not yet settled.
    pub fn pending(&self) -> u64 {
        let ledger = self.shared.ledger.lock();
        ledger.issued - ledger.settled
    }

    /// Every failure recorded so far, oldest first.
    pub fn failures(&self) -> Vec<SyncFailure> {
        self.shared.ledger.lock().failures.clone()
    }

    /// Blocks until every submitted move has settled or `timeout` passes.
    ///
    /// Returns true if nothing is left in flight. Only shutdown paths and
    /// tests call this; interactive paths never wait.
    pub fn wait_settled(&self, timeout: Duration) -> bool {
        let mut ledger = self.shared.ledger.lock();
        self.shared
            .settled
            .wait_while_for(&mut ledger, |l| l.settled < l.issued, timeout);
        ledger.settled >= ledger.issued
    }
}

impl std::fmt::Debug for ReorderSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReorderSync")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}
