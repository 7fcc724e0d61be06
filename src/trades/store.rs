//! In-memory journal trade store

use super::{OutcomeUnit, Trade, TradeFilter, TradePool, TradeSource};
use std::sync::RwLock;

/// Journal trades held in memory, snapshotted on read
#[derive(Debug, Default)]
pub struct TradeStore {
    trades: RwLock<Vec<Trade>>,
}

impl TradeStore {
    /// Create a store holding `trades`
    pub fn new(trades: Vec<Trade>) -> Self {
        Self {
            trades: RwLock::new(trades),
        }
    }

    /// Append a trade
    pub fn insert(&self, trade: Trade) -> anyhow::Result<()> {
        self.trades
            .write()
            .map_err(|_| anyhow::anyhow!("Trade store lock poisoned"))?
            .push(trade);
        Ok(())
    }

    /// Number of stored trades
    pub fn len(&self) -> usize {
        self.trades.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TradeSource for TradeStore {
    fn snapshot(&self, filter: &TradeFilter, unit: OutcomeUnit) -> anyhow::Result<TradePool> {
        let trades = self
            .trades
            .read()
            .map_err(|_| anyhow::anyhow!("Trade store lock poisoned"))?;

        let selected: Vec<Trade> = trades
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();

        tracing::debug!(
            %filter,
            %unit,
            selected = selected.len(),
            total = trades.len(),
            "Took trade pool snapshot"
        );

        Ok(TradePool::from_trades(&selected, unit))
    }
}
