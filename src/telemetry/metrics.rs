//! Simulation metrics

use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Individual runs executed
    RunsCompleted,
    /// History records written
    HistorySaves,
}

/// Final state of a simulation, used as a metric label
#[derive(Debug, Clone, Copy)]
pub enum SimulationStatus {
    Completed,
    Cancelled,
    Rejected,
}

impl SimulationStatus {
    fn as_label(self) -> &'static str {
        match self {
            SimulationStatus::Completed => "completed",
            SimulationStatus::Cancelled => "cancelled",
            SimulationStatus::Rejected => "rejected",
        }
    }
}

/// Increment a counter
pub fn increment_counter(metric: CounterMetric, value: u64) {
    let metric_name = match metric {
        CounterMetric::RunsCompleted => "tradesim_runs_completed_total",
        CounterMetric::HistorySaves => "tradesim_history_saves_total",
    };

    metrics::counter!(metric_name).increment(value);
}

/// Record the current progress of the active simulation
pub fn set_progress(percentage: f64) {
    metrics::gauge!("tradesim_progress_pct").set(percentage);
}

/// Record the outcome and wall time of a simulation
pub fn record_simulation(status: SimulationStatus, elapsed: Duration) {
    metrics::counter!("tradesim_simulations_total", "status" => status.as_label()).increment(1);
    metrics::histogram!("tradesim_simulation_duration_seconds").record(elapsed.as_secs_f64());

    tracing::debug!(
        status = status.as_label(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Recorded simulation"
    );
}
