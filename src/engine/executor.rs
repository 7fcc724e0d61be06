//! Run executor

use super::resampler::Resampler;
use super::rng::RandomSource;
use super::types::SimulationRun;

/// Turns resampled trades into fixed-length equity paths
#[derive(Debug, Clone, Copy)]
pub struct RunExecutor<'a> {
    resampler: Resampler<'a>,
    max_trades_per_run: usize,
    initial_capital: f64,
}

impl<'a> RunExecutor<'a> {
    pub fn new(resampler: Resampler<'a>, max_trades_per_run: usize, initial_capital: f64) -> Self {
        Self {
            resampler,
            max_trades_per_run,
            initial_capital,
        }
    }

    /// Execute one run
    ///
    /// The path always has `max_trades_per_run + 1` points; a run that hits
    /// zero equity is flagged ruined but keeps drawing so every run covers
    /// the same horizon.
    pub fn execute<R: RandomSource + ?Sized>(&self, rng: &mut R) -> SimulationRun {
        let mut equity_series = Vec::with_capacity(self.max_trades_per_run + 1);
        let mut trade_idx = Vec::with_capacity(self.max_trades_per_run);
        let mut equity = self.initial_capital;
        let mut ruined = equity <= 0.0;
        equity_series.push(equity);

        for _ in 0..self.max_trades_per_run {
            let draw = self.resampler.draw(rng);
            equity += draw.outcome;
            if equity <= 0.0 {
                ruined = true;
            }
            trade_idx.push(draw.index);
            equity_series.push(equity);
        }

        SimulationRun {
            equity_series,
            final_equity: equity,
            trade_idx,
            ruined,
        }
    }
}
