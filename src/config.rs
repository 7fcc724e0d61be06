//! Configuration types for tradesim

use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Simulation engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Runs per batch; cancellation is checked between batches
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Worker threads (0 = available parallelism)
    #[serde(default)]
    pub workers: usize,

    /// Maximum sample runs returned and persisted per simulation
    #[serde(default = "default_sample_cap")]
    pub sample_cap: usize,

    /// How per-run drawdowns are reduced into the summary
    #[serde(default)]
    pub drawdown_policy: DrawdownPolicy,

    /// Trade cadence used for annualization; estimated from the pool when absent
    #[serde(default)]
    pub trades_per_year: Option<f64>,
}

/// Reduction applied to per-run maximum drawdowns
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DrawdownPolicy {
    /// Mean of per-run max drawdown (typical risk)
    #[default]
    Mean,
    /// Largest per-run max drawdown (worst case)
    Worst,
}

fn default_batch_size() -> usize {
    250
}
fn default_sample_cap() -> usize {
    25
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 250,
            workers: 0,
            sample_cap: 25,
            drawdown_policy: DrawdownPolicy::Mean,
            trades_per_year: None,
        }
    }
}

/// History store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
}

fn default_history_path() -> PathBuf {
    PathBuf::from("./mc_history.json")
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus listener port; metrics stay in-process when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
