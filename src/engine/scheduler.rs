//! Simulation scheduler
//!
//! Runs are split into fixed-size batches and fanned out over a rayon pool.
//! Each batch owns an RNG stream derived from the base seed and the batch
//! index, and batch accumulators are merged in batch order, so a seeded
//! simulation gives identical output for any worker count. Workers check the
//! cancellation flag and publish progress only between batches.

use super::executor::RunExecutor;
use super::resampler::Resampler;
use super::rng::stream_rng;
use super::types::{
    Progress, RunStatus, SimulationConfig, SimulationError, SimulationOutcome, SimulationRun,
};
use crate::config::EngineConfig;
use crate::stats::{AggregationOptions, RunAccumulator};
use crate::telemetry::{self, CounterMetric, SimulationStatus};
use crate::trades::TradePool;
use rayon::prelude::*;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{oneshot, watch};

/// Shared cooperative cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; batches already running still finish
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

type ProgressListener = Arc<dyn Fn(Progress) + Send + Sync>;

/// Cancellation and progress plumbing for one simulation
pub struct RunControl {
    total: u64,
    cancel: CancelToken,
    progress_tx: watch::Sender<Progress>,
    listener: Option<ProgressListener>,
    // Last count delivered; held while notifying so deliveries stay ordered
    delivered: Mutex<u64>,
}

impl RunControl {
    /// Create controls for `total` runs and the matching progress stream
    pub fn new(total: u64) -> (Self, watch::Receiver<Progress>) {
        let (progress_tx, progress_rx) = watch::channel(Progress::new(total));
        let control = Self {
            total,
            cancel: CancelToken::new(),
            progress_tx,
            listener: None,
            delivered: Mutex::new(0),
        };
        (control, progress_rx)
    }

    /// Call `listener` on the worker thread each time progress advances
    pub fn with_listener(mut self, listener: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs this control reports progress against
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Publish progress to the channel, gauge and listener; never moves backwards
    fn publish(&self, completed: u64) {
        let completed = completed.min(self.total);
        let mut delivered = self
            .delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if completed <= *delivered {
            return;
        }
        *delivered = completed;

        let progress = Progress {
            completed,
            total: self.total,
        };
        self.progress_tx.send_replace(progress);
        telemetry::set_progress(progress.percentage());
        if let Some(ref listener) = self.listener {
            listener(progress);
        }
    }
}

/// Output of one batch
struct BatchResult {
    accumulator: RunAccumulator,
    samples: Vec<SimulationRun>,
}

/// Handle to a simulation running in the background
pub struct SimulationHandle {
    progress: watch::Receiver<Progress>,
    cancel: CancelToken,
    result: oneshot::Receiver<Result<SimulationOutcome, SimulationError>>,
}

impl SimulationHandle {
    /// Progress stream; closes when the simulation finishes
    pub fn progress(&self) -> watch::Receiver<Progress> {
        self.progress.clone()
    }

    /// Latest published progress
    pub fn current_progress(&self) -> Progress {
        *self.progress.borrow()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the simulation has stopped running
    pub fn is_finished(&self) -> bool {
        self.progress.has_changed().is_err()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the final (or partial) outcome
    pub async fn result(self) -> Result<SimulationOutcome, SimulationError> {
        self.result
            .await
            .map_err(|_| SimulationError::WorkerPanicked)?
    }

    /// Blocking variant of [`SimulationHandle::result`]
    ///
    /// # Panics
    /// If called from within an asynchronous execution context.
    pub fn wait(self) -> Result<SimulationOutcome, SimulationError> {
        self.result
            .blocking_recv()
            .map_err(|_| SimulationError::WorkerPanicked)?
    }
}

/// Fans simulation runs out over a fixed-size worker pool
#[derive(Clone)]
pub struct SimulationScheduler {
    settings: EngineConfig,
    workers: Arc<rayon::ThreadPool>,
}

impl SimulationScheduler {
    /// Create a scheduler with its own worker pool
    pub fn new(settings: EngineConfig) -> Result<Self, SimulationError> {
        let workers = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.workers)
            .thread_name(|i| format!("tradesim-worker-{}", i))
            .build()
            .map_err(|e| SimulationError::ThreadPool(e.to_string()))?;

        Ok(Self {
            settings,
            workers: Arc::new(workers),
        })
    }

    pub fn settings(&self) -> &EngineConfig {
        &self.settings
    }

    /// Number of worker threads
    pub fn worker_count(&self) -> usize {
        self.workers.current_num_threads()
    }

    /// Start a simulation on a background thread
    ///
    /// Configuration errors, including an empty pool, are returned here
    /// before any work is dispatched.
    pub fn start(
        &self,
        config: SimulationConfig,
        pool: TradePool,
    ) -> Result<SimulationHandle, SimulationError> {
        config.validate()?;
        Resampler::new(&pool)?;

        let (control, progress) = RunControl::new(config.simulations as u64);
        let cancel = control.cancel_token();
        let (result_tx, result_rx) = oneshot::channel();
        let scheduler = self.clone();

        std::thread::Builder::new()
            .name("tradesim-scheduler".to_string())
            .spawn(move || {
                let result = scheduler.run(&config, &pool, &control);
                // Close the progress stream before the result is observable
                drop(control);
                // Receiver gone means the caller stopped waiting
                let _ = result_tx.send(result);
            })
            .map_err(|e| SimulationError::ThreadPool(e.to_string()))?;

        Ok(SimulationHandle {
            progress,
            cancel,
            result: result_rx,
        })
    }

    /// Run a simulation on the calling thread, blocking until it finishes or
    /// is cancelled
    pub fn run(
        &self,
        config: &SimulationConfig,
        pool: &TradePool,
        control: &RunControl,
    ) -> Result<SimulationOutcome, SimulationError> {
        let started = Instant::now();
        let checked = config
            .validate()
            .and_then(|_| Resampler::new(pool).map(|_| ()))
            .and_then(|_| {
                if control.total == config.simulations as u64 {
                    Ok(())
                } else {
                    Err(SimulationError::invalid_config(format!(
                        "run control expects {} runs but simulations is {}",
                        control.total, config.simulations
                    )))
                }
            });
        if let Err(e) = checked {
            telemetry::record_simulation(SimulationStatus::Rejected, started.elapsed());
            return Err(e);
        }
        let executor = RunExecutor::new(
            Resampler::new(pool)?,
            config.max_trades_per_run,
            config.initial_capital,
        );
        let options = AggregationOptions::resolve(&self.settings, pool);

        let total = config.simulations;
        let batch_size = self.settings.batch_size.max(1);
        let batch_count = total.div_ceil(batch_size);
        let sample_cap = self.settings.sample_cap;
        let completed = AtomicU64::new(0);

        tracing::info!(
            simulations = total,
            max_trades_per_run = config.max_trades_per_run,
            initial_capital = config.initial_capital,
            pool_size = pool.len(),
            batches = batch_count,
            workers = self.worker_count(),
            seeded = config.seed.is_some(),
            "Starting Monte Carlo simulation"
        );

        let batches: Vec<Option<BatchResult>> = self.workers.install(|| {
            (0..batch_count)
                .into_par_iter()
                .map(|batch| {
                    if control.cancel.is_cancelled() {
                        return None;
                    }

                    let start = batch * batch_size;
                    let runs = start..(start + batch_size).min(total);
                    let run_count = runs.len() as u64;
                    let result = run_batch(&executor, config, batch as u64, runs, sample_cap);

                    let done = completed.fetch_add(run_count, Ordering::Relaxed) + run_count;
                    telemetry::increment_counter(CounterMetric::RunsCompleted, run_count);
                    tracing::debug!(batch, runs = run_count, completed = done, "Batch finished");
                    control.publish(done);

                    Some(result)
                })
                .collect()
        });

        let mut accumulator = RunAccumulator::new(config.initial_capital, config.max_trades_per_run);
        let mut sample_runs = Vec::new();
        for batch in batches.into_iter().flatten() {
            accumulator.merge(batch.accumulator);
            sample_runs.extend(batch.samples);
        }
        sample_runs.truncate(sample_cap);

        let completed_runs = accumulator.count();
        let status = if completed_runs < total as u64 {
            RunStatus::Cancelled {
                completed_runs,
                percentage: Progress {
                    completed: completed_runs,
                    total: total as u64,
                }
                .percentage(),
            }
        } else {
            RunStatus::Completed
        };

        let summary = accumulator.finish(&options);
        let elapsed = started.elapsed();

        match status {
            RunStatus::Completed => {
                telemetry::record_simulation(SimulationStatus::Completed, elapsed);
                tracing::info!(
                    runs = completed_runs,
                    elapsed_ms = elapsed.as_millis() as u64,
                    median_final = summary.median_final,
                    prob_ruin = summary.prob_ruin,
                    "Monte Carlo simulation completed"
                );
            }
            RunStatus::Cancelled { percentage, .. } => {
                telemetry::record_simulation(SimulationStatus::Cancelled, elapsed);
                tracing::info!(
                    runs = completed_runs,
                    requested = total,
                    percentage,
                    "Monte Carlo simulation cancelled"
                );
            }
        }

        Ok(SimulationOutcome {
            summary,
            sample_runs,
            status,
        })
    }
}

/// Execute the runs of one batch on its own RNG stream
fn run_batch(
    executor: &RunExecutor<'_>,
    config: &SimulationConfig,
    batch: u64,
    runs: Range<usize>,
    sample_cap: usize,
) -> BatchResult {
    let mut rng = stream_rng(config.seed, batch);
    let mut accumulator = RunAccumulator::new(config.initial_capital, config.max_trades_per_run);
    let mut samples = Vec::new();

    for run_index in runs {
        let run = executor.execute(&mut rng);
        accumulator.push(&run);
        if run_index < sample_cap {
            samples.push(run);
        }
    }

    BatchResult {
        accumulator,
        samples,
    }
}
