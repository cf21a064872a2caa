//! Compute backend abstraction.
//!
//! The actual docking engine (AutoDock Vina, quantum pipelines, ...) lives
//! outside this crate and is driven through [`ComputeBackend`]. The core
//! hands it a cancellation token and a progress sink and otherwise treats
//! the run as opaque. [`SimulatedBackend`] is the built-in implementation
//! used when no real engine is wired in.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::models::{DockingParameters, Interaction, PoseResult};
use crate::core::progress::ProgressReporter;

/// Why a backend run did not produce results.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The run observed its cancellation token and stopped.
    #[error("docking run cancelled")]
    Cancelled,

    /// The engine failed; the message ends up in the job's `error_message`.
    #[error("{0}")]
    Failed(String),
}

/// A long-running, possibly failing docking computation.
///
/// Implementations must honor `cancel` promptly — check it between phases
/// or select on it while waiting on external processes. The scheduler's
/// hard timeout is the backstop for implementations that do not.
#[async_trait]
pub trait ComputeBackend: Send + Sync {
    async fn run(
        &self,
        cancel: CancellationToken,
        parameters: DockingParameters,
        progress: ProgressReporter,
    ) -> Result<Vec<PoseResult>, BackendError>;
}

/// Simulated docking engine.
///
/// Walks the four phases of a real Vina run (structure preparation, grid
/// generation, conformational search, pose analysis) with plausible
/// timings and fabricates pose results. Deterministic when
/// `parameters.seed` is set.
pub struct SimulatedBackend {
    /// Multiplier applied to the phase delays. Tests use small values so a
    /// "full" run finishes in milliseconds.
    pub time_scale: f64,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self { time_scale: 1.0 }
    }
}

/// (duration at scale 1.0, percent complete once the phase ends)
const PHASES: [(Duration, f64); 3] = [
    (Duration::from_millis(1000), 20.0), // prepare structures
    (Duration::from_millis(1000), 40.0), // generate grid maps
    (Duration::from_millis(2000), 80.0), // conformational search
];

const INTERACTION_TYPES: [&str; 6] = [
    "hydrogen_bond",
    "hydrophobic_contact",
    "electrostatic",
    "van_der_waals",
    "pi_pi_stacking",
    "pi_cation",
];

const RESIDUES: [&str; 15] = [
    "ARG123", "ASP156", "PHE189", "LYS234", "TRP267", "SER89", "THR112", "LEU145", "VAL178",
    "GLU201", "HIS245", "TYR298", "CYS134", "MET167", "ILE223",
];

#[async_trait]
impl ComputeBackend for SimulatedBackend {
    async fn run(
        &self,
        cancel: CancellationToken,
        parameters: DockingParameters,
        progress: ProgressReporter,
    ) -> Result<Vec<PoseResult>, BackendError> {
        progress.report(0.0).await;

        for (base, percent) in PHASES {
            let delay = base.mul_f64(self.time_scale.max(0.0));
            tokio::select! {
                _ = cancel.cancelled() => return Err(BackendError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            progress.report(percent).await;
        }

        if cancel.is_cancelled() {
            return Err(BackendError::Cancelled);
        }

        let results = simulate_poses(&parameters);
        progress.report(100.0).await;
        Ok(results)
    }
}

/// Fabricate `num_modes` poses, best binding affinity first.
fn simulate_poses(parameters: &DockingParameters) -> Vec<PoseResult> {
    let mut rng = match parameters.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut results: Vec<PoseResult> = (1..=parameters.num_modes)
        .map(|mode| {
            let binding_affinity =
                rng.random_range(-12.0..-6.0) + rng.random_range(-0.5..0.5);
            let rmsd_lower = rng.random_range(0.0..2.0);
            let rmsd_upper = rmsd_lower + rng.random_range(0.5..3.0);
            PoseResult {
                mode,
                binding_affinity: round2(binding_affinity),
                rmsd_lower_bound: round2(rmsd_lower),
                rmsd_upper_bound: round2(rmsd_upper),
                interactions: simulate_interactions(&mut rng),
            }
        })
        .collect();

    results.sort_by(|a, b| a.binding_affinity.total_cmp(&b.binding_affinity));
    results
}

fn simulate_interactions(rng: &mut StdRng) -> Vec<Interaction> {
    let count = rng.random_range(3..8);
    (0..count)
        .map(|_| {
            let interaction_type = INTERACTION_TYPES[rng.random_range(0..INTERACTION_TYPES.len())];
            let residue = RESIDUES[rng.random_range(0..RESIDUES.len())];

            let (distance, angle) = match interaction_type {
                "hydrogen_bond" => (
                    rng.random_range(1.8..3.2),
                    Some(rng.random_range(120.0..180.0)),
                ),
                "hydrophobic_contact" => (rng.random_range(3.5..5.0), None),
                "electrostatic" => (rng.random_range(2.5..6.0), None),
                "pi_pi_stacking" => (rng.random_range(3.3..4.5), Some(rng.random_range(0.0..30.0))),
                _ => (rng.random_range(3.0..5.5), None),
            };

            Interaction {
                interaction_type: interaction_type.to_string(),
                residue: residue.to_string(),
                distance: round2(distance),
                angle: angle.map(|a| (a * 10.0_f64).round() / 10.0),
                strength: Some(round2(interaction_strength(interaction_type, distance))),
            }
        })
        .collect()
}

/// Closer contacts of stronger interaction classes score higher.
fn interaction_strength(interaction_type: &str, distance: f64) -> f64 {
    let base = match interaction_type {
        "hydrogen_bond" => 5.0,
        "electrostatic" => 4.0,
        "pi_cation" => 3.5,
        "pi_pi_stacking" => 3.0,
        "hydrophobic_contact" => 2.0,
        _ => 1.0,
    };
    base / (1.0 + distance * 0.5)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
