//! Trade pool module
//!
//! Read-only views of journal trades that feed the simulation engine. The
//! journal itself lives outside this crate; [`TradeSource`] is the seam.

mod loader;
mod pool;
mod store;

pub use loader::{load_trades, parse_csv, parse_json, TradeLoadError, TradeRecord};
pub use pool::TradePool;
pub(crate) use pool::profit_factor;
pub use store::TradeStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed journal trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Realized profit or loss in account currency
    pub pnl: f64,
    /// Profit or loss as a multiple of initial risk
    pub r_multiple: Option<f64>,
    /// Close timestamp
    pub timestamp: DateTime<Utc>,
    /// Strategy tag
    pub strategy: Option<String>,
    /// Category tag (instrument class, setup family, ...)
    pub category: Option<String>,
}

impl Trade {
    /// Create a trade with a dollar outcome and no tags
    pub fn new(pnl: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            pnl,
            r_multiple: None,
            timestamp,
            strategy: None,
            category: None,
        }
    }

    pub fn with_r_multiple(mut self, r_multiple: f64) -> Self {
        self.r_multiple = Some(r_multiple);
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Outcome in the requested unit, if the trade carries one
    pub fn outcome(&self, unit: OutcomeUnit) -> Option<f64> {
        match unit {
            OutcomeUnit::Pnl => Some(self.pnl),
            OutcomeUnit::RMultiple => self.r_multiple,
        }
    }
}

/// Canonical unit a simulation resamples in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeUnit {
    /// Dollar profit and loss
    #[default]
    Pnl,
    /// R-multiples
    #[serde(rename = "r", alias = "rmultiple")]
    RMultiple,
}

impl fmt::Display for OutcomeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeUnit::Pnl => write!(f, "pnl"),
            OutcomeUnit::RMultiple => write!(f, "r"),
        }
    }
}

impl std::str::FromStr for OutcomeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pnl" | "usd" => Ok(OutcomeUnit::Pnl),
            "r" | "rmultiple" => Ok(OutcomeUnit::RMultiple),
            other => Err(format!("unknown outcome unit '{}', expected pnl or r", other)),
        }
    }
}

/// Selects the trades that make up a pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeFilter {
    pub strategy: Option<String>,
    pub category: Option<String>,
    /// Inclusive lower bound on trade timestamp
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on trade timestamp
    pub to: Option<DateTime<Utc>>,
}

impl TradeFilter {
    /// Whether a trade passes every populated criterion
    pub fn matches(&self, trade: &Trade) -> bool {
        if let Some(ref strategy) = self.strategy {
            if trade.strategy.as_ref() != Some(strategy) {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if trade.category.as_ref() != Some(category) {
                return false;
            }
        }
        if let Some(from) = self.from {
            if trade.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if trade.timestamp > to {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for TradeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "strategy={} category={}",
            self.strategy.as_deref().unwrap_or("*"),
            self.category.as_deref().unwrap_or("*")
        )?;
        if let Some(from) = self.from {
            write!(f, " from={}", from.to_rfc3339())?;
        }
        if let Some(to) = self.to {
            write!(f, " to={}", to.to_rfc3339())?;
        }
        Ok(())
    }
}

/// Read-only source of historical trades
///
/// Implementations must return a copy that later writes to the source
/// cannot affect.
pub trait TradeSource: Send + Sync {
    /// Take a snapshot of the trades selected by `filter`, in `unit`
    fn snapshot(&self, filter: &TradeFilter, unit: OutcomeUnit) -> anyhow::Result<TradePool>;
}
