//! Bounded worker pool driving jobs through their lifecycle.
//!
//! A single dispatch loop pulls job ids off an unbounded FIFO queue,
//! acquires one of `max_concurrent_jobs` semaphore permits, flips the job
//! `Pending -> Running` and spawns a worker task that owns the permit for
//! the whole run. The permit is released by drop on every exit path
//! (completion, failure, cancellation, timeout), so slots cannot leak.
//!
//! Cancellation is cooperative: `cancel_running` only trips the job's
//! token; the worker's completion handler records the terminal state. A
//! per-job wall-clock budget backstops backends that ignore their token.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::backend::{BackendError, ComputeBackend};
use crate::core::models::{DockingParameters, JobStatus};
use crate::core::progress;
use crate::core::store::JobStore;
use crate::error::JobError;
use crate::logging::LogThrottle;

pub struct Scheduler {
    store: JobStore,
    backend: Arc<dyn ComputeBackend>,
    queue_tx: mpsc::UnboundedSender<String>,
    /// Cancellation tokens for admitted jobs, keyed by job id. Entries are
    /// removed by the worker after the terminal transition commits.
    cancellations: Arc<Mutex<HashMap<String, CancellationToken>>>,
    job_timeout: Duration,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Spawn the dispatch loop and return a handle for enqueueing and
    /// cancelling jobs.
    pub fn start(
        store: JobStore,
        backend: Arc<dyn ComputeBackend>,
        max_concurrent_jobs: usize,
        job_timeout: Duration,
    ) -> Arc<Self> {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        let scheduler = Arc::new(Self {
            store,
            backend,
            queue_tx,
            cancellations: Arc::new(Mutex::new(HashMap::new())),
            job_timeout,
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        });

        let gate = Arc::new(Semaphore::new(max_concurrent_jobs));
        tokio::spawn(Self::dispatch_loop(scheduler.clone(), queue_rx, gate));

        tracing::info!(
            max_concurrent_jobs,
            job_timeout_secs = job_timeout.as_secs(),
            "Scheduler started"
        );
        scheduler
    }

    /// Queue a pending job for admission. Returns immediately; execution
    /// starts whenever a slot frees up.
    pub fn enqueue(&self, job_id: &str) {
        // Send only fails after shutdown, when nothing should be enqueued.
        let _ = self.queue_tx.send(job_id.to_string());
    }

    /// Trip the cancellation token of a running job. Returns false when
    /// the job is not currently admitted (already finalizing or never
    /// started), which callers treat as "nothing left to stop".
    pub async fn cancel_running(&self, job_id: &str) -> bool {
        let tokens = self.cancellations.lock().await;
        match tokens.get(job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop admitting jobs and wait for in-flight workers to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Serialized admission: one loop acquires permits and flips jobs to
    /// `Running`, so admission order is exactly queue (submission) order.
    async fn dispatch_loop(
        scheduler: Arc<Scheduler>,
        mut queue_rx: mpsc::UnboundedReceiver<String>,
        gate: Arc<Semaphore>,
    ) {
        loop {
            let job_id = tokio::select! {
                _ = scheduler.shutdown.cancelled() => break,
                id = queue_rx.recv() => match id {
                    Some(id) => id,
                    None => break,
                },
            };

            let permit = tokio::select! {
                _ = scheduler.shutdown.cancelled() => break,
                permit = gate.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            scheduler.clone().admit(job_id, permit).await;
        }

        tracing::info!("Scheduler dispatch loop stopped");
    }

    /// Transition one queued job to `Running` and spawn its worker. The
    /// permit travels into the worker task; if admission fails it is
    /// dropped here, freeing the slot for the next job.
    async fn admit(self: Arc<Self>, job_id: String, permit: OwnedSemaphorePermit) {
        // The token must be registered before the transition commits: a
        // cancel that observes `Running` has to find it, and the store
        // commit is the only thing that makes `Running` observable.
        let token = CancellationToken::new();
        self.cancellations
            .lock()
            .await
            .insert(job_id.clone(), token.clone());

        let admitted = self
            .store
            .compare_and_transition(&job_id, JobStatus::Pending, JobStatus::Running, |job| {
                job.started_at = Some(Utc::now());
            })
            .await;

        match admitted {
            Ok(()) => {}
            Err(JobError::Conflict { actual, .. }) => {
                // Cancelled while queued; the slot goes to the next job.
                self.cancellations.lock().await.remove(&job_id);
                tracing::debug!(job_id = %job_id, status = %actual, "Skipping queued job, no longer pending");
                return;
            }
            Err(e) => {
                self.cancellations.lock().await.remove(&job_id);
                tracing::warn!(job_id = %job_id, error = %e, "Failed to admit queued job");
                return;
            }
        }

        let parameters = match self.store.get(&job_id).await {
            Ok(job) => job.parameters,
            Err(e) => {
                // Deleted between transition and here is not reachable for
                // a running job, but don't crash the dispatcher over it.
                tracing::error!(job_id = %job_id, error = %e, "Admitted job vanished");
                self.cancellations.lock().await.remove(&job_id);
                return;
            }
        };

        tracing::info!(job_id = %job_id, "Job admitted");
        let scheduler = self.clone();
        self.tracker.spawn(async move {
            scheduler.run_job(&job_id, parameters, token).await;
            drop(permit);
        });
    }

    /// Drive one admitted job to a terminal state.
    async fn run_job(
        &self,
        job_id: &str,
        parameters: DockingParameters,
        token: CancellationToken,
    ) {
        let (reporter, mut progress_rx) = progress::channel();

        // Fold progress ticks into the store as they arrive. Ends when the
        // backend's reporter is dropped.
        let store = self.store.clone();
        let id = job_id.to_string();
        let forwarder = tokio::spawn(async move {
            let throttle = LogThrottle::new(Duration::from_millis(500));
            while let Some(percent) = progress_rx.recv().await {
                if throttle.should_log() {
                    tracing::debug!(job_id = %id, percent, "Docking progress");
                }
                store.update_progress(&id, percent).await;
            }
        });

        let outcome = tokio::time::timeout(
            self.job_timeout,
            self.backend.run(token.clone(), parameters, reporter),
        )
        .await;

        let finalized = match outcome {
            Ok(Ok(results)) => {
                self.store
                    .compare_and_transition(job_id, JobStatus::Running, JobStatus::Completed, |job| {
                        job.results = results;
                        job.completed_at = Some(Utc::now());
                    })
                    .await
            }
            Ok(Err(BackendError::Cancelled)) => {
                self.store
                    .compare_and_transition(job_id, JobStatus::Running, JobStatus::Cancelled, |job| {
                        job.completed_at = Some(Utc::now());
                    })
                    .await
            }
            Ok(Err(BackendError::Failed(message))) => {
                self.store
                    .compare_and_transition(job_id, JobStatus::Running, JobStatus::Failed, |job| {
                        job.error_message = Some(message);
                        job.completed_at = Some(Utc::now());
                    })
                    .await
            }
            Err(_elapsed) => {
                // Backend ignored its budget; force the job out of the slot.
                self.store
                    .compare_and_transition(job_id, JobStatus::Running, JobStatus::Failed, |job| {
                        job.error_message = Some(format!(
                            "docking timed out after {}s",
                            self.job_timeout.as_secs()
                        ));
                        job.completed_at = Some(Utc::now());
                    })
                    .await
            }
        };

        match &finalized {
            Ok(()) => {
                let status = self
                    .store
                    .get(job_id)
                    .await
                    .map(|j| j.status.to_string())
                    .unwrap_or_default();
                tracing::info!(job_id, status = %status, "Job finished");
            }
            Err(e) => {
                // Lost the race against another terminal transition; that
                // transition is final and this outcome is discarded.
                tracing::debug!(job_id, error = %e, "Terminal transition lost a race");
            }
        }

        self.cancellations.lock().await.remove(job_id);
        let _ = forwarder.await;
    }
}
