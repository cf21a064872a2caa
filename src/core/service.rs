//! Public contract of the orchestration core.
//!
//! The HTTP layer (and anything else) talks to jobs exclusively through
//! [`JobService`]. It validates submissions, delegates storage to the
//! [`JobStore`] and execution to the [`Scheduler`], and enforces the
//! operation/state matrix from the job lifecycle.

use std::sync::Arc;

use crate::core::models::{
    DockingParameters, JobRecord, JobStats, JobStatus, ParameterReport, PoseResult,
};
use crate::core::scheduler::Scheduler;
use crate::core::store::JobStore;
use crate::error::{JobError, Result};

#[derive(Clone)]
pub struct JobService {
    store: JobStore,
    scheduler: Arc<Scheduler>,
}

impl JobService {
    pub fn new(store: JobStore, scheduler: Arc<Scheduler>) -> Self {
        Self { store, scheduler }
    }

    /// Validate parameters, create a `Pending` record and hand it to the
    /// scheduler. Returns the created record; execution is asynchronous.
    pub async fn submit(
        &self,
        protein_id: &str,
        ligand_id: &str,
        parameters: DockingParameters,
    ) -> Result<JobRecord> {
        let report = check_parameters(&parameters);
        if !report.valid {
            return Err(JobError::Validation(report.errors.join("; ")));
        }
        for warning in &report.warnings {
            tracing::warn!(protein_id, ligand_id, warning = %warning, "Docking parameter warning");
        }

        let record = self.store.create(protein_id, ligand_id, parameters).await;
        tracing::info!(job_id = %record.id, protein_id, ligand_id, "Job submitted");
        self.scheduler.enqueue(&record.id);
        Ok(record)
    }

    /// Current snapshot of a job (status, progress, timestamps, outcome).
    pub async fn get(&self, id: &str) -> Result<JobRecord> {
        self.store.get(id).await
    }

    /// Jobs newest first, optionally filtered by status.
    pub async fn list(
        &self,
        status: Option<JobStatus>,
        limit: usize,
        offset: usize,
    ) -> Vec<JobRecord> {
        self.store.list(status, limit, offset).await
    }

    /// Request cancellation.
    ///
    /// A `Pending` job is cancelled on the spot and will be skipped at
    /// admission. A `Running` job only has its token tripped here; the
    /// scheduler finalizes it as `Cancelled` once the backend yields, so
    /// this returns before the job has actually stopped. Terminal jobs
    /// cannot be cancelled.
    pub async fn cancel(&self, id: &str) -> Result<()> {
        let job = self.store.get(id).await?;
        match job.status {
            JobStatus::Pending => {
                let direct = self
                    .store
                    .compare_and_transition(id, JobStatus::Pending, JobStatus::Cancelled, |j| {
                        j.completed_at = Some(chrono::Utc::now());
                    })
                    .await;
                match direct {
                    Ok(()) => {
                        tracing::info!(job_id = id, "Pending job cancelled");
                        Ok(())
                    }
                    // Admitted between the read and the transition; fall
                    // through to the running path.
                    Err(JobError::Conflict {
                        actual: JobStatus::Running,
                        ..
                    }) => self.cancel_running(id).await,
                    Err(e) => Err(e),
                }
            }
            JobStatus::Running => self.cancel_running(id).await,
            status => Err(JobError::InvalidState {
                id: id.to_string(),
                status,
            }),
        }
    }

    async fn cancel_running(&self, id: &str) -> Result<()> {
        // Tokens are registered before a job becomes observable as
        // `Running`, so a missing one means the worker already finalized;
        // the request is accepted either way, whichever terminal
        // transition commits first wins.
        self.scheduler.cancel_running(id).await;
        tracing::info!(job_id = id, "Cancellation requested");
        Ok(())
    }

    /// Remove a terminal job's record. Pending and running jobs must be
    /// cancelled first.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let job = self.store.get(id).await?;
        if !job.status.is_terminal() {
            return Err(JobError::InvalidState {
                id: id.to_string(),
                status: job.status,
            });
        }
        self.store.delete(id).await?;
        tracing::info!(job_id = id, "Job deleted");
        Ok(())
    }

    /// Pose results of a completed job.
    ///
    /// `Failed` surfaces the recorded error message, `Pending`/`Running`
    /// are not ready, and `Cancelled` reads as not found — a cancelled job
    /// has no outcome to fetch.
    pub async fn results(&self, id: &str) -> Result<Vec<PoseResult>> {
        let job = self.store.get(id).await?;
        match job.status {
            JobStatus::Completed => Ok(job.results),
            JobStatus::Failed => Err(JobError::JobFailed {
                id: id.to_string(),
                message: job
                    .error_message
                    .unwrap_or_else(|| "unknown failure".to_string()),
            }),
            JobStatus::Pending | JobStatus::Running => Err(JobError::NotReady {
                id: id.to_string(),
                status: job.status,
            }),
            JobStatus::Cancelled => Err(JobError::NotFound(id.to_string())),
        }
    }

    /// Aggregate counters for the dashboard.
    pub async fn stats(&self) -> JobStats {
        self.store.stats().await
    }
}

/// Structural parameter check, shared by `submit` and the dry-run
/// validation endpoint.
///
/// Errors reject a submission; warnings flag settings that are legal but
/// likely wasteful or unhelpful for a Vina-style search.
pub fn check_parameters(parameters: &DockingParameters) -> ParameterReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let geometry = [
        parameters.center_x,
        parameters.center_y,
        parameters.center_z,
        parameters.size_x,
        parameters.size_y,
        parameters.size_z,
    ];
    if geometry.iter().any(|v| !v.is_finite()) {
        errors.push("search box center and size must be finite".to_string());
    }

    if parameters.exhaustiveness < 1 {
        errors.push("exhaustiveness must be at least 1".to_string());
    } else if parameters.exhaustiveness > 32 {
        warnings.push("very high exhaustiveness may not improve results".to_string());
    }

    if parameters.num_modes < 1 {
        errors.push("number of modes must be at least 1".to_string());
    } else if parameters.num_modes > 20 {
        warnings.push("large number of modes may generate redundant results".to_string());
    }

    let volume = parameters.box_volume();
    if volume.is_finite() {
        if volume < 1000.0 {
            warnings.push("small search space may miss important binding sites".to_string());
        } else if volume > 50000.0 {
            warnings
                .push("large search space will significantly increase computation time".to_string());
        }
    }

    if parameters.energy_range < 1.0 {
        warnings.push("small energy range may miss relevant binding modes".to_string());
    } else if parameters.energy_range > 10.0 {
        warnings.push("large energy range may include poor binding modes".to_string());
    }

    ParameterReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}
