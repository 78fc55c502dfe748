/// Monitoring engine module
///
/// This module is responsible for:
/// - Executing ping/HTTP probes against registered targets
/// - Dispatching each service to its configured probe strategy
/// - Driving the fixed-cadence scheduler and its per-service pipelines
pub mod checker;
pub mod executor;
pub mod scheduler;
pub mod types;

pub use executor::{ProbeExecutor, ProbeSettings};
pub use scheduler::Scheduler;
pub use types::CheckOutcome;
