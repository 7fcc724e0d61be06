//! Simulation engine types

use crate::stats::{max_drawdown, SimulationSummary};
use crate::trades::{OutcomeUnit, TradeFilter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Parameters of one simulation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    /// Only resample trades tagged with this strategy
    #[serde(rename = "strategy", default)]
    pub strategy_filter: Option<String>,
    /// Only resample trades tagged with this category
    #[serde(rename = "category", default)]
    pub category_filter: Option<String>,
    /// Earliest trade timestamp considered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    /// Latest trade timestamp considered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    /// Unit resampled (dollar P&L or R-multiple)
    #[serde(default)]
    pub unit: OutcomeUnit,
    /// Number of independent runs
    pub simulations: usize,
    /// Trades drawn per run
    pub max_trades_per_run: usize,
    /// Starting equity of every run
    pub initial_capital: f64,
    /// Seed for reproducible runs; fresh entropy when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Create an unfiltered dollar simulation
    pub fn new(simulations: usize, max_trades_per_run: usize, initial_capital: f64) -> Self {
        Self {
            strategy_filter: None,
            category_filter: None,
            from: None,
            to: None,
            unit: OutcomeUnit::Pnl,
            simulations,
            max_trades_per_run,
            initial_capital,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy_filter = Some(strategy.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category_filter = Some(category.into());
        self
    }

    pub fn with_unit(mut self, unit: OutcomeUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_date_range(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Trade filter selecting this simulation's pool
    pub fn filter(&self) -> TradeFilter {
        TradeFilter {
            strategy: self.strategy_filter.clone(),
            category: self.category_filter.clone(),
            from: self.from,
            to: self.to,
        }
    }

    /// Strategy/category label used in listings and exports
    pub fn label(&self) -> String {
        match (&self.strategy_filter, &self.category_filter) {
            (Some(s), Some(c)) => format!("{}/{}", s, c),
            (Some(s), None) => s.clone(),
            (None, Some(c)) => c.clone(),
            (None, None) => "All".to_string(),
        }
    }

    /// Reject configurations that cannot produce a run
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.simulations == 0 {
            return Err(SimulationError::invalid_config(
                "simulations must be greater than zero",
            ));
        }
        if self.max_trades_per_run == 0 {
            return Err(SimulationError::invalid_config(
                "max_trades_per_run must be greater than zero",
            ));
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(SimulationError::invalid_config(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(SimulationError::invalid_config(
                    "date range start is after its end",
                ));
            }
        }
        Ok(())
    }
}

/// One simulated equity path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRun {
    /// Equity after each trade, starting with the initial capital
    pub equity_series: Vec<f64>,
    /// Last value of `equity_series`
    pub final_equity: f64,
    /// Pool index of each drawn trade
    pub trade_idx: Vec<usize>,
    /// Equity reached zero or below at some point
    pub ruined: bool,
}

impl SimulationRun {
    /// Number of trades in the run
    pub fn len(&self) -> usize {
        self.trade_idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trade_idx.is_empty()
    }

    /// Per-trade equity changes
    pub fn pnls(&self) -> impl Iterator<Item = f64> + '_ {
        self.equity_series.windows(2).map(|w| w[1] - w[0])
    }

    /// Largest peak-to-trough decline as a fraction of the peak
    pub fn max_drawdown(&self) -> f64 {
        max_drawdown(&self.equity_series)
    }
}

/// Whether a simulation ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum RunStatus {
    #[default]
    Completed,
    /// Stopped early; the summary covers only the completed runs
    #[serde(rename_all = "camelCase")]
    Cancelled { completed_runs: u64, percentage: f64 },
}

impl RunStatus {
    pub fn is_partial(&self) -> bool {
        matches!(self, RunStatus::Cancelled { .. })
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Cancelled { percentage, .. } => write!(f, "stopped at {:.0}%", percentage),
        }
    }
}

/// Snapshot of scheduler progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Runs finished so far
    pub completed: u64,
    /// Runs requested
    pub total: u64,
}

impl Progress {
    pub fn new(total: u64) -> Self {
        Self {
            completed: 0,
            total,
        }
    }

    /// Completion percentage, clamped to 100
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f64 / self.total as f64 * 100.0).min(100.0)
        }
    }

    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

/// Result of a simulation, possibly partial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutcome {
    pub summary: SimulationSummary,
    /// Capped sample of runs, lowest run index first
    pub sample_runs: Vec<SimulationRun>,
    pub status: RunStatus,
}

impl SimulationOutcome {
    pub fn is_partial(&self) -> bool {
        self.status.is_partial()
    }
}

/// Simulation engine errors
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration rejected before any run started
    #[error("Invalid simulation config: {message}")]
    InvalidConfig { message: String },
    /// Filtering left nothing to resample
    #[error("No trades to resample ({filter})")]
    EmptyPool { filter: String },
    /// Trade source could not produce a snapshot
    #[error("Trade source unavailable: {0}")]
    Source(String),
    /// Worker pool could not be created
    #[error("Worker pool error: {0}")]
    ThreadPool(String),
    /// Scheduler thread exited without reporting a result
    #[error("Simulation worker terminated unexpectedly")]
    WorkerPanicked,
}

impl SimulationError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether the error was raised before any work started
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SimulationError::InvalidConfig { .. } | SimulationError::EmptyPool { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_positive() {
        assert!(SimulationConfig::new(100, 50, 10_000.0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_counts() {
        let err = SimulationConfig::new(0, 50, 10_000.0).validate().unwrap_err();
        assert!(err.is_config_error());
        assert!(SimulationConfig::new(100, 0, 10_000.0).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_capital() {
        assert!(SimulationConfig::new(100, 50, 0.0).validate().is_err());
        assert!(SimulationConfig::new(100, 50, -5.0).validate().is_err());
        assert!(SimulationConfig::new(100, 50, f64::NAN).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let now = Utc::now();
        let config = SimulationConfig::new(10, 10, 1000.0)
            .with_date_range(Some(now), Some(now - chrono::Duration::days(1)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_label() {
        let base = SimulationConfig::new(1, 1, 1.0);
        assert_eq!(base.label(), "All");
        assert_eq!(base.clone().with_strategy("ORB").label(), "ORB");
        assert_eq!(base.clone().with_category("futures").label(), "futures");
        assert_eq!(
            base.with_strategy("ORB").with_category("futures").label(),
            "ORB/futures"
        );
    }

    #[test]
    fn test_config_json_shape() {
        let config = SimulationConfig::new(1000, 100, 25_000.0).with_strategy("ORB");
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["strategy"], "ORB");
        assert!(json["category"].is_null());
        assert_eq!(json["simulations"], 1000);
        assert_eq!(json["maxTradesPerRun"], 100);
        assert_eq!(json["initialCapital"], 25_000.0);
        assert!(json.get("seed").is_none());
    }

    #[test]
    fn test_run_pnls_and_drawdown() {
        let run = SimulationRun {
            equity_series: vec![1000.0, 1100.0, 990.0, 1050.0],
            final_equity: 1050.0,
            trade_idx: vec![0, 1, 0],
            ruined: false,
        };

        let pnls: Vec<f64> = run.pnls().collect();
        assert_eq!(pnls.len(), 3);
        assert!((pnls[1] + 110.0).abs() < 1e-9);
        assert!((run.max_drawdown() - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RunStatus::Completed.to_string(), "completed");
        let cancelled = RunStatus::Cancelled {
            completed_runs: 500,
            percentage: 50.0,
        };
        assert_eq!(cancelled.to_string(), "stopped at 50%");
        assert!(cancelled.is_partial());
    }

    #[test]
    fn test_progress_percentage() {
        let mut progress = Progress::new(200);
        assert_eq!(progress.percentage(), 0.0);
        progress.completed = 50;
        assert!((progress.percentage() - 25.0).abs() < 1e-12);
        progress.completed = 250;
        assert_eq!(progress.percentage(), 100.0);
        assert!(progress.is_done());
    }
}
