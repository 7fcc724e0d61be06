//! Simulation history
//!
//! Persisted simulation results, keyed by id. Records are immutable once
//! stored and only removed by an explicit delete.

mod export;
mod file;
mod memory;

pub use export::{export_csv, CSV_HEADER};
pub use file::JsonFileHistory;
pub use memory::InMemoryHistory;

use crate::engine::{RunStatus, SimulationConfig, SimulationOutcome, SimulationRun};
use crate::stats::SimulationSummary;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use thiserror::Error;
use uuid::Uuid;

/// A stored simulation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub config: SimulationConfig,
    pub summary: SimulationSummary,
    /// Capped sample of the simulated runs
    #[serde(default)]
    pub sample_runs: Vec<SimulationRun>,
    #[serde(default)]
    pub status: RunStatus,
}

impl HistoryItem {
    /// Record an outcome under a fresh id, keeping at most `sample_cap` runs
    pub fn new(config: SimulationConfig, outcome: &SimulationOutcome, sample_cap: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            config,
            summary: outcome.summary.clone(),
            sample_runs: outcome.sample_runs.iter().take(sample_cap).cloned().collect(),
            status: outcome.status,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.status.is_partial()
    }
}

/// History persistence errors
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("History serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("History export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("History task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("History item already exists: {0}")]
    DuplicateId(String),
}

/// Storage for simulation history
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Store a new item and return its id
    async fn save(&self, item: HistoryItem) -> Result<String, HistoryError>;

    /// All items, newest first
    async fn list(&self) -> Result<Vec<HistoryItem>, HistoryError>;

    /// Look up one item
    async fn get(&self, id: &str) -> Result<Option<HistoryItem>, HistoryError>;

    /// Remove an item; `false` when the id is unknown
    async fn delete(&self, id: &str) -> Result<bool, HistoryError>;
}

/// Order items newest first; among equal timestamps the later insert wins
fn newest_first(mut items: Vec<HistoryItem>) -> Vec<HistoryItem> {
    items.reverse();
    items.sort_by_key(|item| Reverse(item.created_at));
    items
}
