//! Monte Carlo simulation engine
//!
//! Bootstrap-resamples journal outcomes into equity paths:
//! - Resampler: uniform draws with replacement from a trade pool
//! - Run executor: one fixed-length equity path per run
//! - Scheduler: batched fan-out over a worker pool with progress and cancellation

mod executor;
mod resampler;
mod rng;
mod scheduler;
mod types;

pub use executor::RunExecutor;
pub use resampler::{Draw, Resampler};
pub use rng::{stream_rng, RandomSource, SimRng};
pub use scheduler::{CancelToken, RunControl, SimulationHandle, SimulationScheduler};
pub use types::{
    Progress, RunStatus, SimulationConfig, SimulationError, SimulationOutcome, SimulationRun,
};
