//! Statistics aggregation
//!
//! Reduces simulation runs into a [`SimulationSummary`]. Reducers are running
//! sums, so batches can be accumulated independently and merged; percentiles
//! are the one step that needs every final equity.

mod accumulator;
mod percentile;
mod summary;

pub use accumulator::RunAccumulator;
pub use percentile::percentile;
pub use summary::{non_finite, SimulationSummary};

use crate::config::{DrawdownPolicy, EngineConfig};
use crate::engine::{SimulationConfig, SimulationRun};
use crate::trades::TradePool;

/// Trading days per year, used when the cadence is unknown
pub const DEFAULT_TRADES_PER_YEAR: f64 = 252.0;

/// Settings that shape the summary but not the runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationOptions {
    /// Trade cadence used for CAGR and annualized ratios
    pub trades_per_year: f64,
    pub drawdown_policy: DrawdownPolicy,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            trades_per_year: DEFAULT_TRADES_PER_YEAR,
            drawdown_policy: DrawdownPolicy::Mean,
        }
    }
}

impl AggregationOptions {
    /// Configured cadence, else the pool's estimate, else the default
    pub fn resolve(settings: &EngineConfig, pool: &TradePool) -> Self {
        let trades_per_year = settings
            .trades_per_year
            .filter(|t| t.is_finite() && *t > 0.0)
            .or_else(|| pool.trades_per_year())
            .unwrap_or(DEFAULT_TRADES_PER_YEAR);

        Self {
            trades_per_year,
            drawdown_policy: settings.drawdown_policy,
        }
    }
}

/// Largest peak-to-trough decline as a fraction of the running peak
///
/// Points before equity first turns positive are skipped. Declines below
/// zero equity are not clamped, so a ruined path can exceed 1.0.
pub fn max_drawdown(series: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for &value in series {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            worst = worst.max((peak - value) / peak);
        }
    }

    worst
}

/// Summarize a complete set of runs
pub fn aggregate(
    runs: &[SimulationRun],
    config: &SimulationConfig,
    options: &AggregationOptions,
) -> SimulationSummary {
    let mut accumulator = RunAccumulator::new(config.initial_capital, config.max_trades_per_run);
    for run in runs {
        accumulator.push(run);
    }
    accumulator.finish(options)
}
