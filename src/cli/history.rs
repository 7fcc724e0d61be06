//! History command implementation

use super::OutputFormat;
use crate::config::Config;
use crate::history::{export_csv, HistoryItem, HistoryRepository, JsonFileHistory};
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List saved simulations, newest first
    List,
    /// Show one saved simulation
    Show {
        id: String,
        /// Output format: table or json
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Delete a saved simulation
    Delete { id: String },
    /// Export saved simulations as CSV
    Export {
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Ids to export (all when omitted)
        ids: Vec<String>,
    },
}

impl HistoryArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let history = JsonFileHistory::new(&config.history.path);

        match &self.command {
            HistoryCommand::List => {
                let items = history.list().await?;
                if items.is_empty() {
                    println!("No saved simulations in {}", history.path().display());
                    return Ok(());
                }
                println!("{}", format_list(&items));
            }
            HistoryCommand::Show { id, format } => {
                let item = history
                    .get(id)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("No saved simulation with id {}", id))?;
                match format {
                    OutputFormat::Table => {
                        println!("Simulation {} ({})", item.id, item.created_at.to_rfc3339());
                        println!(
                            "  {}: {} runs x {} trades, capital {:.2}, status {}",
                            item.config.label(),
                            item.config.simulations,
                            item.config.max_trades_per_run,
                            item.config.initial_capital,
                            item.status
                        );
                        println!("{}", item.summary.format_table());
                    }
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&item)?),
                }
            }
            HistoryCommand::Delete { id } => {
                if history.delete(id).await? {
                    println!("Deleted simulation {}", id);
                } else {
                    println!("No saved simulation with id {}", id);
                }
            }
            HistoryCommand::Export { output, ids } => {
                let items = if ids.is_empty() {
                    history.list().await?
                } else {
                    let mut selected = Vec::with_capacity(ids.len());
                    for id in ids {
                        let item = history
                            .get(id)
                            .await?
                            .ok_or_else(|| anyhow::anyhow!("No saved simulation with id {}", id))?;
                        selected.push(item);
                    }
                    selected
                };

                let bytes = export_csv(&items)?;
                match output {
                    Some(path) => {
                        tokio::fs::write(path, &bytes).await?;
                        tracing::info!(path = %path.display(), items = items.len(), "Exported history");
                    }
                    None => print!("{}", String::from_utf8_lossy(&bytes)),
                }
            }
        }

        Ok(())
    }
}

/// One line per item
fn format_list(items: &[HistoryItem]) -> String {
    let mut out = format!(
        "{:<36}  {:<20}  {:<16}  {:>8}  {:>8}  {:>8}  {}\n",
        "ID", "CREATED", "STRATEGY", "RUNS", "CAGR", "MAX DD", "STATUS"
    );
    for item in items {
        out.push_str(&format!(
            "{:<36}  {:<20}  {:<16}  {:>8}  {:>7.2}%  {:>7.2}%  {}\n",
            item.id,
            item.created_at.format("%Y-%m-%d %H:%M:%S"),
            item.config.label(),
            item.summary.total_runs,
            item.summary.cagr * 100.0,
            item.summary.max_drawdown * 100.0,
            item.status
        ));
    }
    out
}
