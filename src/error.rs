use thiserror::Error;

use crate::core::models::JobStatus;

/// Everything that can go wrong in the orchestration core.
///
/// Callers are expected to branch on the variant: `Validation` means the
/// request itself is malformed, `NotFound` the id is unknown, and the
/// state-related variants mean the operation is illegal for the job's
/// current status. None of these are retried automatically.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid docking parameters: {0}")]
    Validation(String),

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job {id} is {status}, operation not allowed")]
    InvalidState { id: String, status: JobStatus },

    #[error("illegal status transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("job {id} changed concurrently (expected {expected}, found {actual})")]
    Conflict {
        id: String,
        expected: JobStatus,
        actual: JobStatus,
    },

    #[error("job {id} is {status}, results not ready")]
    NotReady { id: String, status: JobStatus },

    #[error("job {id} failed: {message}")]
    JobFailed { id: String, message: String },
}

pub type Result<T> = std::result::Result<T, JobError>;
