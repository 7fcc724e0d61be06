//! Monte Carlo service
//!
//! Entry point for callers: snapshots the journal, starts simulations on the
//! scheduler and reads and writes simulation history.

use crate::config::EngineConfig;
use crate::engine::{
    CancelToken, Progress, SimulationConfig, SimulationError, SimulationHandle,
    SimulationOutcome, SimulationScheduler,
};
use crate::history::{export_csv, HistoryError, HistoryItem, HistoryRepository};
use crate::telemetry::{self, CounterMetric, SimulationStatus};
use crate::trades::TradeSource;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// The most recently started simulation
struct ActiveRun {
    cancel: CancelToken,
    progress: watch::Receiver<Progress>,
}

impl ActiveRun {
    /// Still running and not yet asked to stop
    fn is_running(&self) -> bool {
        // The progress stream closes when the scheduler thread exits
        self.progress.has_changed().is_ok() && !self.cancel.is_cancelled()
    }
}

/// Simulation and history operations over a trade source
pub struct MonteCarloService<S, H> {
    source: Arc<S>,
    history: Arc<H>,
    scheduler: SimulationScheduler,
    active: Mutex<Option<ActiveRun>>,
}

impl<S: TradeSource, H: HistoryRepository> MonteCarloService<S, H> {
    /// Create a service with its own worker pool
    pub fn new(
        source: Arc<S>,
        history: Arc<H>,
        settings: EngineConfig,
    ) -> Result<Self, SimulationError> {
        Ok(Self::with_scheduler(
            source,
            history,
            SimulationScheduler::new(settings)?,
        ))
    }

    /// Create a service sharing an existing scheduler
    pub fn with_scheduler(source: Arc<S>, history: Arc<H>, scheduler: SimulationScheduler) -> Self {
        Self {
            source,
            history,
            scheduler,
            active: Mutex::new(None),
        }
    }

    pub fn scheduler(&self) -> &SimulationScheduler {
        &self.scheduler
    }

    /// Snapshot the matching trades and start a simulation
    ///
    /// Invalid parameters and empty pools are rejected before any run is
    /// dispatched.
    pub fn run_simulation(
        &self,
        config: SimulationConfig,
    ) -> Result<SimulationHandle, SimulationError> {
        let result = self.start(config);
        if let Err(ref e) = result {
            telemetry::record_simulation(SimulationStatus::Rejected, Duration::ZERO);
            tracing::warn!(error = %e, "Simulation rejected");
        }
        result
    }

    fn start(&self, config: SimulationConfig) -> Result<SimulationHandle, SimulationError> {
        config.validate()?;

        let filter = config.filter();
        let pool = self
            .source
            .snapshot(&filter, config.unit)
            .map_err(|e| SimulationError::Source(e.to_string()))?;
        if pool.is_empty() {
            return Err(SimulationError::EmptyPool {
                filter: filter.to_string(),
            });
        }

        let handle = self.scheduler.start(config, pool)?;
        if let Ok(mut active) = self.active.lock() {
            *active = Some(ActiveRun {
                cancel: handle.cancel_token(),
                progress: handle.progress(),
            });
        }
        Ok(handle)
    }

    /// Cancel the most recently started simulation
    ///
    /// Returns `false` when nothing was started, it already finished or it
    /// was already stopped.
    pub fn stop_simulation(&self) -> bool {
        let active = match self.active.lock() {
            Ok(mut active) => active.take(),
            Err(_) => None,
        };

        match active {
            Some(run) if run.is_running() => {
                run.cancel.cancel();
                tracing::info!("Simulation stop requested");
                true
            }
            _ => false,
        }
    }

    /// Store an outcome, partial or complete, in history
    pub async fn persist(
        &self,
        config: &SimulationConfig,
        outcome: &SimulationOutcome,
    ) -> Result<HistoryItem, HistoryError> {
        let item = HistoryItem::new(config.clone(), outcome, self.scheduler.settings().sample_cap);
        self.history.save(item.clone()).await?;

        telemetry::increment_counter(CounterMetric::HistorySaves, 1);
        tracing::info!(
            id = %item.id,
            label = %item.config.label(),
            status = %item.status,
            "Saved simulation to history"
        );
        Ok(item)
    }

    pub async fn list_history(&self) -> Result<Vec<HistoryItem>, HistoryError> {
        self.history.list().await
    }

    pub async fn get_history_item(&self, id: &str) -> Result<Option<HistoryItem>, HistoryError> {
        self.history.get(id).await
    }

    pub async fn delete_history_item(&self, id: &str) -> Result<bool, HistoryError> {
        let deleted = self.history.delete(id).await?;
        tracing::info!(id, deleted, "Deleted history item");
        Ok(deleted)
    }

    /// Render items as CSV
    pub fn export_history_csv(&self, items: &[HistoryItem]) -> Result<Vec<u8>, HistoryError> {
        export_csv(items)
    }
}
