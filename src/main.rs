use clap::Parser;
use tradesim::cli::{Cli, Commands};
use tradesim::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    let _telemetry = tradesim::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Simulate(args) => {
            tracing::info!("Starting simulation");
            args.execute(&config).await?;
        }
        Commands::History(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Engine: batch_size={}, workers={}, sample_cap={}, drawdown={:?}",
                config.engine.batch_size,
                config.engine.workers,
                config.engine.sample_cap,
                config.engine.drawdown_policy
            );
            match config.engine.trades_per_year {
                Some(tpy) => println!("  Trades per year: {}", tpy),
                None => println!("  Trades per year: estimated from journal"),
            }
            println!("  History: {}", config.history.path.display());
            println!(
                "  Telemetry: level={}, format={:?}, metrics_port={:?}",
                config.telemetry.log_level, config.telemetry.log_format, config.telemetry.metrics_port
            );
        }
    }

    Ok(())
}
