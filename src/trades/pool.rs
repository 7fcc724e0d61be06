//! Immutable trade pool snapshot

use super::{OutcomeUnit, Trade};
use chrono::{DateTime, Utc};
use std::sync::Arc;

const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// Outcomes the resampler draws from
///
/// Cloning is cheap; every clone shares the same immutable storage, so one
/// snapshot can be handed to every worker of a simulation.
#[derive(Debug, Clone)]
pub struct TradePool {
    outcomes: Arc<[f64]>,
    timestamps: Arc<[DateTime<Utc>]>,
    unit: OutcomeUnit,
}

impl TradePool {
    /// Build a pool from trades, keeping those with a finite outcome in `unit`
    pub fn from_trades(trades: &[Trade], unit: OutcomeUnit) -> Self {
        let (outcomes, timestamps): (Vec<f64>, Vec<DateTime<Utc>>) = trades
            .iter()
            .filter_map(|t| {
                t.outcome(unit)
                    .filter(|v| v.is_finite())
                    .map(|v| (v, t.timestamp))
            })
            .unzip();

        Self {
            outcomes: outcomes.into(),
            timestamps: timestamps.into(),
            unit,
        }
    }

    /// Build an undated dollar pool straight from outcomes
    pub fn from_outcomes(outcomes: Vec<f64>) -> Self {
        Self {
            outcomes: outcomes.into_iter().filter(|v| v.is_finite()).collect(),
            timestamps: Arc::from(Vec::new()),
            unit: OutcomeUnit::Pnl,
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn unit(&self) -> OutcomeUnit {
        self.unit
    }

    /// Outcome at `index`
    ///
    /// # Panics
    /// If `index` is out of bounds.
    #[inline]
    pub fn outcome(&self, index: usize) -> f64 {
        self.outcomes[index]
    }

    pub fn outcomes(&self) -> &[f64] {
        &self.outcomes
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Mean outcome per trade
    pub fn mean_outcome(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.outcomes.iter().sum::<f64>() / self.outcomes.len() as f64
    }

    /// Smallest outcome, `None` for an empty pool
    pub fn worst_outcome(&self) -> Option<f64> {
        self.outcomes.iter().copied().reduce(f64::min)
    }

    /// Gross profit over gross loss of the historical trades
    ///
    /// Infinity when there are profits but no losses, zero when neither.
    pub fn profit_factor(&self) -> f64 {
        let (profit, loss) = self
            .outcomes
            .iter()
            .fold((0.0, 0.0), |(p, l), &v| {
                if v > 0.0 {
                    (p + v, l)
                } else {
                    (p, l - v)
                }
            });

        profit_factor(profit, loss)
    }

    /// Trades per year implied by the spacing of the pool's timestamps
    ///
    /// `None` when the pool has fewer than two trades or they share a
    /// single timestamp.
    pub fn trades_per_year(&self) -> Option<f64> {
        if self.timestamps.len() < 2 {
            return None;
        }
        let first = self.timestamps.iter().min()?;
        let last = self.timestamps.iter().max()?;
        let span_secs = (*last - *first).num_seconds() as f64;
        if span_secs <= 0.0 {
            return None;
        }

        let years = span_secs / SECONDS_PER_YEAR;
        Some((self.timestamps.len() - 1) as f64 / years)
    }
}

/// Profit factor with the zero-loss sentinels applied
pub(crate) fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}
