//! End-to-end simulation tests

use chrono::{Duration, TimeZone, Utc};
use std::io::Write;
use std::sync::Arc;
use tradesim::config::{Config, EngineConfig};
use tradesim::engine::{
    RunControl, RunStatus, SimulationConfig, SimulationError, SimulationScheduler,
};
use tradesim::history::InMemoryHistory;
use tradesim::service::MonteCarloService;
use tradesim::trades::{load_trades, OutcomeUnit, Trade, TradePool, TradeStore};

fn settings(workers: usize, batch_size: usize) -> EngineConfig {
    EngineConfig {
        workers,
        batch_size,
        ..Default::default()
    }
}

fn reference_pool() -> TradePool {
    TradePool::from_outcomes(vec![100.0, -50.0, 100.0, -50.0])
}

#[test]
fn test_config_example_exists() {
    let config: Config = toml::from_str(include_str!("../../config.toml.example")).unwrap();
    assert_eq!(config.engine.sample_cap, 25);
    assert_eq!(config.telemetry.log_level, "info");
}

#[test]
fn test_reference_pool_average() {
    let pool = reference_pool();
    assert!((pool.profit_factor() - 2.0).abs() < 1e-12);

    let scheduler = SimulationScheduler::new(settings(4, 100)).unwrap();
    let config = SimulationConfig::new(1000, 4, 1000.0).with_seed(2024);
    let (control, _) = RunControl::new(1000);
    let outcome = scheduler.run(&config, &pool, &control).unwrap();

    let summary = &outcome.summary;
    assert_eq!(summary.total_runs, 1000);
    assert!((summary.avg_final - 1100.0).abs() < 15.0, "avg {}", summary.avg_final);
    assert!(summary.p05 <= summary.p25);
    assert!(summary.p25 <= summary.median_final);
    assert!(summary.median_final <= summary.p75);
    assert!(summary.p75 <= summary.p95);
    assert_eq!(summary.prob_ruin, 0.0);
    // Pool minimum is 800, maximum 1400
    assert!(summary.p05 >= 800.0 && summary.p95 <= 1400.0);
}

#[test]
fn test_every_run_reconciles() {
    let pool = reference_pool();
    let scheduler = SimulationScheduler::new(EngineConfig {
        workers: 2,
        batch_size: 10,
        sample_cap: 200,
        ..Default::default()
    })
    .unwrap();
    let config = SimulationConfig::new(200, 12, 500.0).with_seed(1);
    let (control, _) = RunControl::new(200);
    let outcome = scheduler.run(&config, &pool, &control).unwrap();

    assert_eq!(outcome.sample_runs.len(), 200);
    for run in &outcome.sample_runs {
        assert_eq!(run.equity_series.len(), 13);
        assert_eq!(run.final_equity, *run.equity_series.last().unwrap());
        let drawn: f64 = run.trade_idx.iter().map(|&i| pool.outcome(i)).sum();
        assert!((run.final_equity - (500.0 + drawn)).abs() < 1e-9);
        assert_eq!(run.ruined, run.equity_series.iter().any(|&v| v <= 0.0));
    }
}

#[test]
fn test_seed_reproducible_across_worker_counts() {
    let pool = TradePool::from_outcomes(vec![250.0, -100.0, 40.0, -180.0, 75.0]);
    let config = SimulationConfig::new(3000, 60, 2000.0).with_seed(99);

    let mut outcomes = Vec::new();
    for workers in [1, 3, 8] {
        let scheduler = SimulationScheduler::new(settings(workers, 128)).unwrap();
        let (control, _) = RunControl::new(3000);
        outcomes.push(scheduler.run(&config, &pool, &control).unwrap());
    }

    assert_eq!(outcomes[0], outcomes[1]);
    assert_eq!(outcomes[1], outcomes[2]);
}

#[test]
fn test_unseeded_runs_differ() {
    let pool = TradePool::from_outcomes(vec![250.0, -100.0, 40.0, -180.0, 75.0]);
    let scheduler = SimulationScheduler::new(settings(2, 100)).unwrap();
    let config = SimulationConfig::new(500, 40, 2000.0);

    let (control, _) = RunControl::new(500);
    let a = scheduler.run(&config, &pool, &control).unwrap();
    let (control, _) = RunControl::new(500);
    let b = scheduler.run(&config, &pool, &control).unwrap();
    assert_ne!(a.sample_runs, b.sample_runs);
}

#[test]
fn test_no_ruin_when_capital_dwarfs_losses() {
    let pool = TradePool::from_outcomes(vec![-500.0, 200.0, -300.0]);
    let worst = pool.worst_outcome().unwrap();
    let scheduler = SimulationScheduler::new(settings(2, 100)).unwrap();
    let config = SimulationConfig::new(500, 50, -worst * 50.0 * 10.0).with_seed(3);

    let (control, _) = RunControl::new(500);
    let outcome = scheduler.run(&config, &pool, &control).unwrap();
    assert_eq!(outcome.summary.prob_ruin, 0.0);
    assert!(outcome.summary.expected_value < 0.0);
}

#[test]
fn test_ruin_probability_bounds() {
    let pool = TradePool::from_outcomes(vec![-400.0, 150.0]);
    let scheduler = SimulationScheduler::new(settings(2, 50)).unwrap();
    let config = SimulationConfig::new(400, 30, 1000.0).with_seed(8);

    let (control, _) = RunControl::new(400);
    let summary = scheduler.run(&config, &pool, &control).unwrap().summary;
    assert!(summary.prob_ruin > 0.0 && summary.prob_ruin <= 1.0);
    assert!(summary.sharpe.is_finite());
    assert!(summary.cagr >= -1.0);
}

#[test]
fn test_empty_pool_rejected_before_work() {
    let scheduler = SimulationScheduler::new(settings(2, 100)).unwrap();
    let result = scheduler.start(
        SimulationConfig::new(1000, 10, 1000.0),
        TradePool::from_outcomes(vec![]),
    );

    match result {
        Err(SimulationError::EmptyPool { .. }) => {}
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("empty pool accepted"),
    }
}

#[test]
fn test_stop_at_half_returns_partial() {
    let scheduler = SimulationScheduler::new(settings(1, 100)).unwrap();
    let config = SimulationConfig::new(1000, 4, 1000.0).with_seed(5);
    let (control, progress) = RunControl::new(1000);
    let token = control.cancel_token();
    let control = control.with_listener(move |p| {
        if p.percentage() >= 50.0 {
            token.cancel();
        }
    });

    let outcome = scheduler.run(&config, &reference_pool(), &control).unwrap();

    assert!(outcome.is_partial());
    assert!(outcome.summary.total_runs < 1000);
    let pct = progress.borrow().percentage();
    assert!((50.0..60.0).contains(&pct), "pct {pct}");
    match outcome.status {
        RunStatus::Cancelled { percentage, .. } => assert!((percentage - pct).abs() < 1e-9),
        RunStatus::Completed => panic!("expected partial outcome"),
    }
    assert_eq!(outcome.status.to_string(), format!("stopped at {:.0}%", pct));
}

#[tokio::test]
async fn test_journal_file_to_summary() {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 15, 30, 0).unwrap();
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "timestamp,pnl,r_multiple,strategy,category").unwrap();
    for i in 0..40 {
        let ts = start + Duration::days(i);
        let (pnl, r) = if i % 4 == 0 { ("-120.50", "-1.0") } else { ("95.25", "0.8") };
        let strategy = if i % 2 == 0 { "ORB" } else { "Fade" };
        writeln!(file, "{},{},{},{},futures", ts.to_rfc3339(), pnl, r, strategy).unwrap();
    }
    file.flush().unwrap();

    let trades: Vec<Trade> = load_trades(file.path()).unwrap();
    assert_eq!(trades.len(), 40);

    let service = MonteCarloService::new(
        Arc::new(TradeStore::new(trades)),
        Arc::new(InMemoryHistory::new()),
        settings(2, 50),
    )
    .unwrap();

    let config = SimulationConfig::new(300, 20, 10.0)
        .with_seed(17)
        .with_strategy("ORB")
        .with_unit(OutcomeUnit::RMultiple)
        .with_date_range(Some(start), Some(start + Duration::days(19)));

    let handle = service.run_simulation(config.clone()).unwrap();
    let outcome = handle.result().await.unwrap();
    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.summary.total_runs, 300);

    // ORB trades in range: days 0, 2, ..., 18; days 0, 4, ..., 16 lose 1R
    assert!((outcome.summary.expected_value - (-5.0 + 5.0 * 0.8) / 10.0).abs() < 0.1);

    let item = service.persist(&config, &outcome).await.unwrap();
    assert_eq!(item.config.label(), "ORB");
    assert_eq!(service.list_history().await.unwrap().len(), 1);
}
