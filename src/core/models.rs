//! Data model for docking jobs.
//!
//! A [`JobRecord`] is the single source of truth for one submitted docking
//! request. Records are owned by the [`JobStore`](crate::core::JobStore);
//! everything else works with clones of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle state of a docking job.
///
/// `Pending` is the initial state. `Completed`, `Failed` and `Cancelled`
/// are terminal; a record in a terminal state never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether `self -> next` is a legal state-machine edge.
    ///
    /// Legal edges: `Pending -> Running`, `Pending -> Cancelled` (cancel
    /// before admission), and `Running -> {Completed, Failed, Cancelled}`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Cancelled)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// AutoDock Vina style search parameters.
///
/// Snapshotted into the [`JobRecord`] at submission time; later mutation of
/// caller-side values cannot affect a queued or running job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockingParameters {
    /// Search box center, in Å.
    #[serde(default)]
    pub center_x: f64,
    #[serde(default)]
    pub center_y: f64,
    #[serde(default)]
    pub center_z: f64,
    /// Search box size, in Å.
    #[serde(default = "default_box_size")]
    pub size_x: f64,
    #[serde(default = "default_box_size")]
    pub size_y: f64,
    #[serde(default = "default_box_size")]
    pub size_z: f64,
    #[serde(default = "default_exhaustiveness")]
    pub exhaustiveness: u32,
    #[serde(default = "default_num_modes")]
    pub num_modes: u32,
    #[serde(default = "default_energy_range")]
    pub energy_range: f64,
    /// Random seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_box_size() -> f64 {
    20.0
}

fn default_exhaustiveness() -> u32 {
    8
}

fn default_num_modes() -> u32 {
    9
}

fn default_energy_range() -> f64 {
    3.0
}

impl Default for DockingParameters {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            center_z: 0.0,
            size_x: default_box_size(),
            size_y: default_box_size(),
            size_z: default_box_size(),
            exhaustiveness: default_exhaustiveness(),
            num_modes: default_num_modes(),
            energy_range: default_energy_range(),
            seed: None,
        }
    }
}

impl DockingParameters {
    /// Search box volume in Å³.
    pub fn box_volume(&self) -> f64 {
        self.size_x * self.size_y * self.size_z
    }
}

/// One protein-ligand contact reported for a pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub interaction_type: String,
    pub residue: String,
    /// Contact distance in Å.
    pub distance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
}

/// One binding mode produced by the compute backend.
///
/// The orchestration core records these verbatim; it never interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseResult {
    pub mode: u32,
    /// Binding affinity in kcal/mol (more negative is better).
    pub binding_affinity: f64,
    pub rmsd_lower_bound: f64,
    pub rmsd_upper_bound: f64,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

/// One submitted docking request and its tracked outcome.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: String,
    pub protein_id: String,
    pub ligand_id: String,
    pub parameters: DockingParameters,
    pub status: JobStatus,
    /// Percent complete in `[0, 100]`, non-decreasing while running.
    pub progress: f64,
    pub results: Vec<PoseResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Aggregate counters over the whole store.
#[derive(Debug, Clone, Serialize)]
pub struct JobStats {
    pub total_jobs: usize,
    pub status_distribution: HashMap<String, usize>,
    /// Mean wall-clock seconds from `started_at` to `completed_at` over
    /// completed jobs, when any exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_completion_time_seconds: Option<f64>,
    /// Pending plus running.
    pub active_jobs: usize,
}

/// Outcome of a dry-run parameter check.
///
/// `errors` non-empty means a submission with these parameters would be
/// rejected; `warnings` are advisory only.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}
