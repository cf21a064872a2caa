pub mod backend;
pub mod models;
pub mod progress;
pub mod scheduler;
pub mod service;
pub mod store;

pub use backend::{BackendError, ComputeBackend, SimulatedBackend};
pub use models::{
    DockingParameters, Interaction, JobRecord, JobStats, JobStatus, ParameterReport, PoseResult,
};
pub use progress::ProgressReporter;
pub use scheduler::Scheduler;
pub use service::JobService;
pub use store::JobStore;
