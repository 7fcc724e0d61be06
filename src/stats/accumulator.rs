//! Mergeable run accumulator

use super::percentile::{percentile, sort_values};
use super::summary::SimulationSummary;
use super::AggregationOptions;
use crate::config::DrawdownPolicy;
use crate::engine::SimulationRun;
use crate::trades::profit_factor;

/// Central moments of final equity, merged pairwise
///
/// Kept as mean and centered sums so a tight spread far from the initial
/// capital does not vanish into cancellation.
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    n: f64,
    mean: f64,
    m2: f64,
    m3: f64,
    m4: f64,
}

impl Moments {
    fn push(&mut self, x: f64) {
        let n1 = self.n;
        self.n += 1.0;
        let n = self.n;
        let delta = x - self.mean;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term = delta * delta_n * n1;

        self.mean += delta_n;
        self.m4 += term * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term;
    }

    fn merge(&mut self, other: &Moments) {
        if other.n == 0.0 {
            return;
        }
        if self.n == 0.0 {
            *self = *other;
            return;
        }

        let (na, nb) = (self.n, other.n);
        let n = na + nb;
        let delta = other.mean - self.mean;
        let delta2 = delta * delta;

        let m2 = self.m2 + other.m2 + delta2 * na * nb / n;
        let m3 = self.m3
            + other.m3
            + delta2 * delta * na * nb * (na - nb) / (n * n)
            + 3.0 * delta * (na * other.m2 - nb * self.m2) / n;
        let m4 = self.m4
            + other.m4
            + delta2 * delta2 * na * nb * (na * na - na * nb + nb * nb) / (n * n * n)
            + 6.0 * delta2 * (na * na * other.m2 + nb * nb * self.m2) / (n * n)
            + 4.0 * delta * (na * other.m3 - nb * self.m3) / n;

        self.mean += delta * nb / n;
        self.n = n;
        self.m2 = m2;
        self.m3 = m3;
        self.m4 = m4;
    }

    /// Skewness and excess kurtosis; zero for a degenerate spread
    fn shape(&self) -> (f64, f64) {
        if self.n == 0.0 {
            return (0.0, 0.0);
        }
        let var = self.m2 / self.n;
        // Spread at the rounding level of the mean is noise
        let noise = 1e-9 * self.mean.abs().max(1.0);
        if var <= noise * noise {
            return (0.0, 0.0);
        }

        let m3 = self.m3 / self.n;
        let m4 = self.m4 / self.n;
        (
            finite_or_zero(m3 / var.powf(1.5)),
            finite_or_zero(m4 / (var * var) - 3.0),
        )
    }
}

/// Running sums over a set of simulation runs
///
/// Every field except `finals` is a sum, an extremum or a pairwise-mergeable
/// moment, so accumulators built on disjoint batches merge into the same
/// result as one built over all runs. Final equities are kept for the
/// percentile sort.
#[derive(Debug, Clone)]
pub struct RunAccumulator {
    initial_capital: f64,
    max_trades_per_run: usize,
    count: u64,
    // Final equity minus initial capital
    moments: Moments,
    finals: Vec<f64>,
    ruined: u64,
    profitable: u64,
    drawdown_sum: f64,
    drawdown_worst: f64,
    trade_count: u64,
    // Per-trade returns (pnl / initial capital)
    ret_sum: f64,
    ret_sum2: f64,
    downside_sum2: f64,
    gross_profit: f64,
    gross_loss: f64,
    pnl_sum: f64,
}

impl RunAccumulator {
    pub fn new(initial_capital: f64, max_trades_per_run: usize) -> Self {
        Self {
            initial_capital,
            max_trades_per_run,
            count: 0,
            moments: Moments::default(),
            finals: Vec::new(),
            ruined: 0,
            profitable: 0,
            drawdown_sum: 0.0,
            drawdown_worst: 0.0,
            trade_count: 0,
            ret_sum: 0.0,
            ret_sum2: 0.0,
            downside_sum2: 0.0,
            gross_profit: 0.0,
            gross_loss: 0.0,
            pnl_sum: 0.0,
        }
    }

    /// Runs accumulated so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Fold one run into the sums
    pub fn push(&mut self, run: &SimulationRun) {
        self.count += 1;
        self.moments.push(run.final_equity - self.initial_capital);
        self.finals.push(run.final_equity);

        if run.ruined {
            self.ruined += 1;
        }
        if run.final_equity > self.initial_capital {
            self.profitable += 1;
        }

        let drawdown = run.max_drawdown();
        self.drawdown_sum += drawdown;
        self.drawdown_worst = self.drawdown_worst.max(drawdown);

        for pnl in run.pnls() {
            let ret = pnl / self.initial_capital;
            self.trade_count += 1;
            self.pnl_sum += pnl;
            self.ret_sum += ret;
            self.ret_sum2 += ret * ret;
            if ret < 0.0 {
                self.downside_sum2 += ret * ret;
            }
            if pnl > 0.0 {
                self.gross_profit += pnl;
            } else {
                self.gross_loss -= pnl;
            }
        }
    }

    /// Absorb another accumulator for the same simulation
    pub fn merge(&mut self, other: RunAccumulator) {
        self.count += other.count;
        self.moments.merge(&other.moments);
        self.finals.extend(other.finals);
        self.ruined += other.ruined;
        self.profitable += other.profitable;
        self.drawdown_sum += other.drawdown_sum;
        self.drawdown_worst = self.drawdown_worst.max(other.drawdown_worst);
        self.trade_count += other.trade_count;
        self.ret_sum += other.ret_sum;
        self.ret_sum2 += other.ret_sum2;
        self.downside_sum2 += other.downside_sum2;
        self.gross_profit += other.gross_profit;
        self.gross_loss += other.gross_loss;
        self.pnl_sum += other.pnl_sum;
    }

    /// Reduce the sums into a summary
    pub fn finish(mut self, options: &AggregationOptions) -> SimulationSummary {
        if self.count == 0 {
            return SimulationSummary::empty();
        }

        let n = self.count as f64;
        sort_values(&mut self.finals);
        let median_final = percentile(&self.finals, 0.50);

        let mean_d = self.moments.mean;
        let (skewness, kurtosis) = self.moments.shape();

        let max_drawdown = match options.drawdown_policy {
            DrawdownPolicy::Mean => self.drawdown_sum / n,
            DrawdownPolicy::Worst => self.drawdown_worst,
        };

        let cagr = self.cagr(median_final, options.trades_per_year);
        let calmar = if max_drawdown > 0.0 {
            cagr / max_drawdown
        } else {
            0.0
        };

        let (sharpe, sortino) = self.risk_adjusted(options.trades_per_year);

        if self.gross_loss == 0.0 && self.gross_profit > 0.0 {
            tracing::warn!(
                runs = self.count,
                "No losing trades drawn; profit factor is infinite"
            );
        }

        SimulationSummary {
            total_runs: self.count,
            median_final,
            avg_final: finite_or_zero(self.initial_capital + mean_d),
            p05: percentile(&self.finals, 0.05),
            p25: percentile(&self.finals, 0.25),
            p75: percentile(&self.finals, 0.75),
            p95: percentile(&self.finals, 0.95),
            max_drawdown: finite_or_zero(max_drawdown),
            worst_drawdown: finite_or_zero(self.drawdown_worst),
            cagr,
            calmar: finite_or_zero(calmar),
            sharpe,
            sortino,
            profit_factor: profit_factor(self.gross_profit, self.gross_loss),
            expected_value: if self.trade_count > 0 {
                finite_or_zero(self.pnl_sum / self.trade_count as f64)
            } else {
                0.0
            },
            skewness,
            kurtosis,
            prob_ruin: self.ruined as f64 / n,
            prob_profit: self.profitable as f64 / n,
        }
    }

    /// CAGR of the median path over `max_trades_per_run / trades_per_year` years
    fn cagr(&self, median_final: f64, trades_per_year: f64) -> f64 {
        let years = self.max_trades_per_run as f64 / trades_per_year;
        if !years.is_finite() || years <= 0.0 {
            return 0.0;
        }
        let growth = median_final / self.initial_capital;
        if growth <= 0.0 {
            return -1.0;
        }
        finite_or_zero(growth.powf(1.0 / years) - 1.0)
    }

    /// Annualized Sharpe and Sortino of per-trade returns
    fn risk_adjusted(&self, trades_per_year: f64) -> (f64, f64) {
        if self.trade_count == 0 {
            return (0.0, 0.0);
        }
        let n = self.trade_count as f64;
        let mean = self.ret_sum / n;
        let variance = (self.ret_sum2 / n - mean * mean).max(0.0);
        let std_dev = variance.sqrt();
        let downside_dev = (self.downside_sum2 / n).sqrt();
        let annualize = trades_per_year.max(0.0).sqrt();

        let sharpe = if std_dev > 0.0 {
            mean / std_dev * annualize
        } else {
            0.0
        };
        let sortino = if downside_dev > 0.0 {
            mean / downside_dev * annualize
        } else {
            0.0
        };

        (finite_or_zero(sharpe), finite_or_zero(sortino))
    }
}

/// Collapse NaN and infinities to zero
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
