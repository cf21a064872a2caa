//! Shared harness for scheduler and service tests: a scriptable compute
//! backend plus polling helpers.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use dockd::core::{
    BackendError, ComputeBackend, DockingParameters, JobRecord, JobService, JobStatus, JobStore,
    PoseResult, ProgressReporter, Scheduler,
};

pub enum Outcome {
    Succeed,
    Fail(String),
}

/// Backend that sleeps for a configurable duration, ticks progress at 25%
/// and 50%, then finishes with the scripted outcome.
pub struct TestBackend {
    pub duration: Duration,
    pub outcome: Outcome,
    /// When set, the backend never checks its cancellation token, standing
    /// in for a misbehaving engine that only the hard timeout can stop.
    pub ignore_cancellation: bool,
}

impl TestBackend {
    pub fn quick() -> Self {
        Self::with_duration(Duration::from_millis(50))
    }

    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration,
            outcome: Outcome::Succeed,
            ignore_cancellation: false,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            duration: Duration::from_millis(50),
            outcome: Outcome::Fail(message.to_string()),
            ignore_cancellation: false,
        }
    }
}

#[async_trait]
impl ComputeBackend for TestBackend {
    async fn run(
        &self,
        cancel: CancellationToken,
        _parameters: DockingParameters,
        progress: ProgressReporter,
    ) -> Result<Vec<PoseResult>, BackendError> {
        let half = self.duration / 2;
        for percent in [25.0, 50.0] {
            if self.ignore_cancellation {
                tokio::time::sleep(half).await;
            } else {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(BackendError::Cancelled),
                    _ = tokio::time::sleep(half) => {}
                }
            }
            progress.report(percent).await;
        }

        match &self.outcome {
            Outcome::Succeed => Ok(vec![sample_pose()]),
            Outcome::Fail(message) => Err(BackendError::Failed(message.clone())),
        }
    }
}

pub fn sample_pose() -> PoseResult {
    PoseResult {
        mode: 1,
        binding_affinity: -9.1,
        rmsd_lower_bound: 0.0,
        rmsd_upper_bound: 1.4,
        interactions: Vec::new(),
    }
}

/// Wire up store, scheduler and service around the given backend.
pub fn setup(
    max_concurrent_jobs: usize,
    job_timeout: Duration,
    backend: TestBackend,
) -> JobService {
    let store = JobStore::new();
    let scheduler = Scheduler::start(store.clone(), Arc::new(backend), max_concurrent_jobs, job_timeout);
    JobService::new(store, scheduler)
}

pub async fn submit(service: &JobService, tag: &str) -> String {
    service
        .submit(&format!("prot-{tag}"), &format!("lig-{tag}"), DockingParameters::default())
        .await
        .expect("submit failed")
        .id
}

/// Poll until the job reaches `status` or the deadline passes.
pub async fn wait_for_status(
    service: &JobService,
    id: &str,
    status: JobStatus,
    within: Duration,
) -> JobRecord {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        let job = service.get(id).await.expect("job disappeared while waiting");
        if job.status == status {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} stuck in {}, wanted {status}",
            job.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
