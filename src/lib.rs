//! tradesim: Monte Carlo performance simulation for trading journal strategies
//!
//! This library provides the core components for:
//! - Trade pool snapshots filtered by strategy, category and date
//! - Seeded resampling into fixed-length equity paths
//! - Parallel, cancellable simulation scheduling with progress
//! - Mergeable statistics (percentiles, drawdown, CAGR, Sharpe/Sortino)
//! - Simulation history with JSON persistence and CSV export
//! - Full observability stack

pub mod cli;
pub mod config;
pub mod engine;
pub mod history;
pub mod service;
pub mod stats;
pub mod telemetry;
pub mod trades;
