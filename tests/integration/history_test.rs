//! History persistence tests

use std::sync::Arc;
use tempfile::TempDir;
use tradesim::config::EngineConfig;
use tradesim::engine::{RunStatus, SimulationConfig};
use tradesim::history::{
    export_csv, HistoryItem, HistoryRepository, JsonFileHistory, CSV_HEADER,
};
use tradesim::service::MonteCarloService;
use tradesim::trades::{Trade, TradeStore};

fn service(path: &std::path::Path) -> MonteCarloService<TradeStore, JsonFileHistory> {
    let now = chrono::Utc::now();
    let trades = vec![
        Trade::new(100.0, now).with_strategy("ORB"),
        Trade::new(-50.0, now).with_strategy("ORB"),
        Trade::new(80.0, now).with_strategy("Fade").with_category("fx"),
        Trade::new(-60.0, now).with_strategy("Fade").with_category("fx"),
    ];
    MonteCarloService::new(
        Arc::new(TradeStore::new(trades)),
        Arc::new(JsonFileHistory::new(path)),
        EngineConfig {
            workers: 2,
            batch_size: 100,
            sample_cap: 5,
            ..Default::default()
        },
    )
    .unwrap()
}

async fn simulate_and_save(
    service: &MonteCarloService<TradeStore, JsonFileHistory>,
    config: SimulationConfig,
) -> HistoryItem {
    let outcome = service
        .run_simulation(config.clone())
        .unwrap()
        .result()
        .await
        .unwrap();
    service.persist(&config, &outcome).await.unwrap()
}

#[tokio::test]
async fn test_saved_item_round_trips_through_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mc_history.json");
    let service = service(&path);

    let item = simulate_and_save(
        &service,
        SimulationConfig::new(400, 25, 2000.0)
            .with_seed(4)
            .with_strategy("ORB"),
    )
    .await;
    assert_eq!(item.sample_runs.len(), 5);
    assert_eq!(item.status, RunStatus::Completed);

    // A fresh store reads back exactly what was written
    let reopened = JsonFileHistory::new(&path);
    assert_eq!(reopened.get(&item.id).await.unwrap(), Some(item.clone()));

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let stored = &raw["items"][0];
    assert_eq!(stored["id"], item.id.as_str());
    assert_eq!(stored["config"]["strategy"], "ORB");
    assert_eq!(stored["config"]["simulations"], 400);
    assert_eq!(stored["summary"]["totalRuns"], 400);
    assert!(stored["summary"]["probRuin"].is_number());
}

#[tokio::test]
async fn test_list_delete_export() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir.path().join("history.json"));

    let first = simulate_and_save(
        &service,
        SimulationConfig::new(100, 10, 1000.0).with_seed(1).with_strategy("ORB"),
    )
    .await;
    let second = simulate_and_save(
        &service,
        SimulationConfig::new(200, 10, 1000.0)
            .with_seed(2)
            .with_strategy("Fade")
            .with_category("fx"),
    )
    .await;

    let listed = service.list_history().await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);

    let csv = String::from_utf8(service.export_history_csv(&listed).unwrap()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], CSV_HEADER.join(","));
    assert!(lines[1].contains("Fade/fx"));
    assert!(lines[1].contains(",200,10,1000.00,"));
    assert!(lines[2].contains(",ORB,100,10,1000.00,"));

    assert!(service.delete_history_item(&first.id).await.unwrap());
    assert!(!service.delete_history_item(&first.id).await.unwrap());
    assert!(service.get_history_item(&first.id).await.unwrap().is_none());
    assert_eq!(service.list_history().await.unwrap(), vec![second]);
}

#[tokio::test]
async fn test_partial_outcome_is_tagged() {
    let dir = TempDir::new().unwrap();
    let history = JsonFileHistory::new(dir.path().join("history.json"));

    let outcome = tradesim::engine::SimulationOutcome {
        summary: tradesim::stats::SimulationSummary::empty(),
        sample_runs: vec![],
        status: RunStatus::Cancelled {
            completed_runs: 250,
            percentage: 50.0,
        },
    };
    let item = HistoryItem::new(SimulationConfig::new(500, 10, 1000.0), &outcome, 25);
    let id = history.save(item).await.unwrap();

    let stored = history.get(&id).await.unwrap().unwrap();
    assert!(stored.is_partial());
    assert_eq!(stored.status.to_string(), "stopped at 50%");

    let csv = String::from_utf8(export_csv(&[stored]).unwrap()).unwrap();
    assert!(csv.lines().nth(1).unwrap().contains(",All,500,10,"));
}
