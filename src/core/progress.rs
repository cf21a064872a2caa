//! Progress reporting channel between a compute backend and the job store.
//!
//! Backends only see a [`ProgressReporter`]; the scheduler owns the
//! receiving end and folds readings into the store, which enforces the
//! clamping and monotonicity rules.

use tokio::sync::mpsc;

const PROGRESS_CHANNEL_CAPACITY: usize = 32;

/// Sink handed to [`ComputeBackend::run`](crate::core::ComputeBackend::run)
/// for fractional progress updates.
#[derive(Clone)]
pub struct ProgressReporter {
    tx: mpsc::Sender<f64>,
}

impl ProgressReporter {
    /// Report percent complete in `[0, 100]`.
    ///
    /// Never fails: once the job is finalized the receiver is gone and
    /// further reports are dropped, which is fine — a backend that keeps
    /// ticking after cancellation must not error out over it.
    pub async fn report(&self, percent: f64) {
        let _ = self.tx.send(percent).await;
    }
}

/// Create a reporter and its receiving end.
pub fn channel() -> (ProgressReporter, mpsc::Receiver<f64>) {
    let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    (ProgressReporter { tx }, rx)
}
