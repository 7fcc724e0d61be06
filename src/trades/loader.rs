//! Journal export loader
//!
//! Reads closed trades from CSV or JSON journal exports. Amounts are parsed
//! as decimals, the way the journal stores them, and converted to floats for
//! the engine.

use super::Trade;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading journal trades
#[derive(Debug, Error)]
pub enum TradeLoadError {
    #[error("Failed to read trades: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid CSV trade record: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid JSON trade records: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Amount out of range at record {record}: {value}")]
    InvalidAmount { record: usize, value: Decimal },
    #[error("Unsupported trade file format: {0}")]
    UnsupportedFormat(String),
}

/// One row of a journal export
#[derive(Debug, Clone, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub pnl: Decimal,
    #[serde(default)]
    pub r_multiple: Option<Decimal>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl TradeRecord {
    fn into_trade(self, record: usize) -> Result<Trade, TradeLoadError> {
        let pnl = self.pnl.to_f64().ok_or(TradeLoadError::InvalidAmount {
            record,
            value: self.pnl,
        })?;
        let r_multiple = match self.r_multiple {
            Some(r) => Some(
                r.to_f64()
                    .ok_or(TradeLoadError::InvalidAmount { record, value: r })?,
            ),
            None => None,
        };

        Ok(Trade {
            pnl,
            r_multiple,
            timestamp: self.timestamp,
            strategy: self.strategy.filter(|s| !s.is_empty()),
            category: self.category.filter(|s| !s.is_empty()),
        })
    }
}

/// Load trades from a `.csv` or `.json` journal export
pub fn load_trades(path: impl AsRef<Path>) -> Result<Vec<Trade>, TradeLoadError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let file = std::fs::File::open(path)?;
    let trades = match extension.as_str() {
        "csv" => parse_csv(file)?,
        "json" => parse_json(file)?,
        other => return Err(TradeLoadError::UnsupportedFormat(other.to_string())),
    };

    tracing::info!(path = ?path, count = trades.len(), "Loaded journal trades");
    Ok(trades)
}

/// Parse CSV with a `timestamp,pnl[,r_multiple,strategy,category]` header
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<Trade>, TradeLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader
        .deserialize::<TradeRecord>()
        .enumerate()
        .map(|(i, record)| record?.into_trade(i))
        .collect()
}

/// Parse a JSON array of trade records
pub fn parse_json<R: Read>(reader: R) -> Result<Vec<Trade>, TradeLoadError> {
    let records: Vec<TradeRecord> = serde_json::from_reader(reader)?;
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| record.into_trade(i))
        .collect()
}
