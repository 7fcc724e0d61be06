//! Simulate command implementation

use crate::config::Config;
use crate::engine::SimulationConfig;
use crate::history::JsonFileHistory;
use crate::service::MonteCarloService;
use crate::trades::{load_trades, OutcomeUnit, TradeStore};
use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Args, ValueEnum};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;

/// Summary output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Journal export to resample (CSV or JSON)
    #[arg(long)]
    pub trades: PathBuf,

    /// Number of simulated runs
    #[arg(long, default_value = "1000")]
    pub simulations: usize,

    /// Trades drawn per run
    #[arg(long, default_value = "100")]
    pub max_trades: usize,

    /// Initial capital
    #[arg(long, default_value = "10000")]
    pub capital: Decimal,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Strategy filter
    #[arg(long)]
    pub strategy: Option<String>,

    /// Category filter
    #[arg(long)]
    pub category: Option<String>,

    /// Outcome unit: pnl or r
    #[arg(long, default_value = "pnl")]
    pub unit: OutcomeUnit,

    /// Earliest trade (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_from)]
    pub from: Option<DateTime<Utc>>,

    /// Latest trade (RFC 3339 or YYYY-MM-DD, inclusive)
    #[arg(long, value_parser = parse_to)]
    pub to: Option<DateTime<Utc>>,

    /// Save the result to history
    #[arg(long)]
    pub save: bool,

    /// Output format: table or json
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl SimulateArgs {
    /// Simulation parameters described by the arguments
    pub fn simulation_config(&self) -> anyhow::Result<SimulationConfig> {
        let initial_capital = self
            .capital
            .to_f64()
            .ok_or_else(|| anyhow::anyhow!("Capital {} is out of range", self.capital))?;

        let mut config = SimulationConfig::new(self.simulations, self.max_trades, initial_capital)
            .with_unit(self.unit)
            .with_date_range(self.from, self.to);
        config.seed = self.seed;
        config.strategy_filter = self.strategy.clone();
        config.category_filter = self.category.clone();
        Ok(config)
    }

    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let trades = load_trades(&self.trades)
            .with_context(|| format!("Failed to load trades from {}", self.trades.display()))?;

        let service = MonteCarloService::new(
            Arc::new(TradeStore::new(trades)),
            Arc::new(JsonFileHistory::new(&config.history.path)),
            config.engine.clone(),
        )?;

        let sim_config = self.simulation_config()?;
        let handle = service.run_simulation(sim_config.clone())?;

        let mut progress = handle.progress();
        let progress_task = tokio::spawn(async move {
            let mut last_logged = 0.0;
            while progress.changed().await.is_ok() {
                let current = *progress.borrow();
                let pct = current.percentage();
                if pct - last_logged >= 10.0 || current.is_done() {
                    tracing::info!(
                        completed = current.completed,
                        total = current.total,
                        "Progress {:.0}%",
                        pct
                    );
                    last_logged = pct;
                }
            }
        });

        let cancel = handle.cancel_token();
        let interrupt_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping simulation");
                cancel.cancel();
            }
        });

        let outcome = handle.result().await;
        interrupt_task.abort();
        let _ = progress_task.await;
        let outcome = outcome?;

        if outcome.is_partial() {
            tracing::warn!(
                status = %outcome.status,
                runs = outcome.summary.total_runs,
                "Simulation stopped early; summary covers completed runs only"
            );
        }

        match self.format {
            OutputFormat::Table => {
                println!("{}", outcome.summary.format_table());
                if outcome.is_partial() {
                    println!("Status: {}", outcome.status);
                }
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        }

        if self.save {
            let item = service.persist(&sim_config, &outcome).await?;
            println!("Saved simulation {}", item.id);
        }

        Ok(())
    }
}

fn parse_date(value: &str, end_of_day: bool) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}', expected RFC 3339 or YYYY-MM-DD", value))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| "invalid time of day".to_string())?;

    Ok(date.and_time(time).and_utc())
}

fn parse_from(value: &str) -> Result<DateTime<Utc>, String> {
    parse_date(value, false)
}

fn parse_to(value: &str) -> Result<DateTime<Utc>, String> {
    parse_date(value, true)
}
