//! In-memory job registry.
//!
//! The store is the single source of truth for job state. Every status
//! change goes through [`JobStore::compare_and_transition`], which checks
//! the state-machine edge and the caller's expected status under one write
//! lock. That makes transitions linearizable no matter which task issues
//! them, and turns a cancel racing a natural completion into a plain
//! conflict for whichever side loses.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::models::{DockingParameters, JobRecord, JobStats, JobStatus};
use crate::error::{JobError, Result};

/// Thread-safe map of job id to [`JobRecord`].
///
/// Cheap to clone; all clones share the same underlying map. Records never
/// leave the store by reference, only as clones, so mutation is impossible
/// outside the locked mutation paths below.
#[derive(Clone, Default)]
pub struct JobStore {
    inner: Arc<RwLock<HashMap<String, JobRecord>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new `Pending` record and return a snapshot of it.
    ///
    /// The id is a UUIDv7 string, so ids created later compare greater;
    /// the store treats it as opaque beyond uniqueness.
    pub async fn create(
        &self,
        protein_id: &str,
        ligand_id: &str,
        parameters: DockingParameters,
    ) -> JobRecord {
        let record = JobRecord {
            id: Uuid::now_v7().to_string(),
            protein_id: protein_id.to_string(),
            ligand_id: ligand_id.to_string(),
            parameters,
            status: JobStatus::Pending,
            progress: 0.0,
            results: Vec::new(),
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };

        let mut map = self.inner.write().await;
        map.insert(record.id.clone(), record.clone());
        record
    }

    /// Snapshot of a single record.
    pub async fn get(&self, id: &str) -> Result<JobRecord> {
        let map = self.inner.read().await;
        map.get(id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    /// Snapshot of all records matching `status`, newest first, paginated.
    ///
    /// Each call takes a fresh snapshot; there is no cursor to resume.
    pub async fn list(
        &self,
        status: Option<JobStatus>,
        limit: usize,
        offset: usize,
    ) -> Vec<JobRecord> {
        let map = self.inner.read().await;
        let mut jobs: Vec<JobRecord> = map
            .values()
            .filter(|j| status.is_none_or(|s| j.status == s))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        jobs.into_iter().skip(offset).take(limit).collect()
    }

    /// Atomically verify the current status, apply `mutate`, and commit
    /// `next` as the new status.
    ///
    /// Fails with [`JobError::InvalidTransition`] if `expected -> next` is
    /// not a legal edge, and with [`JobError::Conflict`] if the record is
    /// no longer in `expected` (someone else transitioned it first). The
    /// record is untouched on any error. A commit to `Completed` forces
    /// `progress` to 100.
    pub async fn compare_and_transition<F>(
        &self,
        id: &str,
        expected: JobStatus,
        next: JobStatus,
        mutate: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut JobRecord),
    {
        if !expected.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                from: expected,
                to: next,
            });
        }

        let mut map = self.inner.write().await;
        let record = map
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        if record.status != expected {
            return Err(JobError::Conflict {
                id: id.to_string(),
                expected,
                actual: record.status,
            });
        }

        mutate(record);
        record.status = next;
        if next == JobStatus::Completed {
            record.progress = 100.0;
        }
        Ok(())
    }

    /// Record a progress reading for a running job.
    ///
    /// Values are clamped to `[0, 100]`. Readings for jobs that are not
    /// `Running`, and readings lower than the current value, are dropped
    /// silently: progress ticks race with completion by design and a stale
    /// tick must not be fatal.
    pub async fn update_progress(&self, id: &str, value: f64) {
        let mut map = self.inner.write().await;
        if let Some(record) = map.get_mut(id) {
            if record.status != JobStatus::Running {
                return;
            }
            let clamped = value.clamp(0.0, 100.0);
            if clamped > record.progress {
                record.progress = clamped;
            }
        }
    }

    /// Remove a record. Running jobs must be cancelled first; deleting one
    /// here would free its scheduler slot out from under the worker.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut map = self.inner.write().await;
        let record = map
            .get(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        if record.status == JobStatus::Running {
            return Err(JobError::InvalidState {
                id: id.to_string(),
                status: JobStatus::Running,
            });
        }

        map.remove(id);
        Ok(())
    }

    /// Aggregate counters across all records.
    pub async fn stats(&self) -> JobStats {
        let map = self.inner.read().await;

        let mut distribution: HashMap<String, usize> = HashMap::new();
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            distribution.insert(status.to_string(), 0);
        }

        let mut completion_secs = Vec::new();
        for job in map.values() {
            *distribution.entry(job.status.to_string()).or_insert(0) += 1;
            if job.status == JobStatus::Completed {
                if let (Some(started), Some(completed)) = (job.started_at, job.completed_at) {
                    completion_secs.push((completed - started).num_milliseconds() as f64 / 1000.0);
                }
            }
        }

        let active_jobs = distribution["pending"] + distribution["running"];
        let average_completion_time_seconds = if completion_secs.is_empty() {
            None
        } else {
            Some(completion_secs.iter().sum::<f64>() / completion_secs.len() as f64)
        };

        JobStats {
            total_jobs: map.len(),
            status_distribution: distribution,
            average_completion_time_seconds,
            active_jobs,
        }
    }
}
