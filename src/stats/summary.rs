//! Simulation summary

use serde::{Deserialize, Serialize};

/// Aggregate statistics over every run of a simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    /// Runs covered by this summary
    pub total_runs: u64,
    /// Median final equity
    pub median_final: f64,
    /// Mean final equity
    pub avg_final: f64,
    /// Final equity percentiles
    pub p05: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
    /// Per-run max drawdown reduced with the configured policy
    pub max_drawdown: f64,
    /// Largest per-run max drawdown
    #[serde(default)]
    pub worst_drawdown: f64,
    /// Compound annual growth of the median path
    pub cagr: f64,
    /// CAGR over max drawdown
    pub calmar: f64,
    /// Annualized Sharpe ratio of per-trade returns
    pub sharpe: f64,
    /// Annualized Sortino ratio of per-trade returns
    pub sortino: f64,
    /// Gross profit over gross loss of every simulated trade
    #[serde(with = "non_finite")]
    pub profit_factor: f64,
    /// Mean outcome per simulated trade
    pub expected_value: f64,
    /// Skewness of final equity
    pub skewness: f64,
    /// Excess kurtosis of final equity
    pub kurtosis: f64,
    /// Fraction of runs that hit zero equity
    pub prob_ruin: f64,
    /// Fraction of runs ending above initial capital
    #[serde(default)]
    pub prob_profit: f64,
}

impl SimulationSummary {
    /// Summary of zero runs
    pub fn empty() -> Self {
        Self {
            total_runs: 0,
            median_final: 0.0,
            avg_final: 0.0,
            p05: 0.0,
            p25: 0.0,
            p75: 0.0,
            p95: 0.0,
            max_drawdown: 0.0,
            worst_drawdown: 0.0,
            cagr: 0.0,
            calmar: 0.0,
            sharpe: 0.0,
            sortino: 0.0,
            profit_factor: 0.0,
            expected_value: 0.0,
            skewness: 0.0,
            kurtosis: 0.0,
            prob_ruin: 0.0,
            prob_profit: 0.0,
        }
    }

    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let profit_factor = if self.profit_factor.is_finite() {
            format!("{:.2}", self.profit_factor)
        } else {
            "∞".to_string()
        };

        format!(
            r#"
══════════════════════════════════════════════════════
             MONTE CARLO SIMULATION
══════════════════════════════════════════════════════

FINAL EQUITY
───────────────────────────────────────────────────────
Runs:             {}
Average:          {:.2}
Median:           {:.2}
P05 / P25:        {:.2} / {:.2}
P75 / P95:        {:.2} / {:.2}

RETURNS
───────────────────────────────────────────────────────
CAGR:             {:.2}%
Sharpe Ratio:     {:.2}
Sortino Ratio:    {:.2}
Calmar Ratio:     {:.2}
Profit Factor:    {}
Expected Value:   {:+.2}

RISK
───────────────────────────────────────────────────────
Max Drawdown:     {:.2}%
Worst Drawdown:   {:.2}%
Prob. of Ruin:    {:.2}%
Prob. of Profit:  {:.2}%
Skewness:         {:.3}
Kurtosis:         {:.3}
══════════════════════════════════════════════════════
"#,
            self.total_runs,
            self.avg_final,
            self.median_final,
            self.p05,
            self.p25,
            self.p75,
            self.p95,
            self.cagr * 100.0,
            self.sharpe,
            self.sortino,
            self.calmar,
            profit_factor,
            self.expected_value,
            self.max_drawdown * 100.0,
            self.worst_drawdown * 100.0,
            self.prob_ruin * 100.0,
            self.prob_profit * 100.0,
            self.skewness,
            self.kurtosis,
        )
    }
}

/// Serde adapter that stores non-finite floats as strings
///
/// JSON has no literal for infinity; `"Infinity"`, `"-Infinity"` and `"NaN"`
/// are written instead and read back.
pub mod non_finite {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if *value > 0.0 {
            serializer.serialize_str("Infinity")
        } else {
            serializer.serialize_str("-Infinity")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "Infinity" | "inf" => Ok(f64::INFINITY),
                "-Infinity" | "-inf" => Ok(f64::NEG_INFINITY),
                "NaN" => Ok(f64::NAN),
                other => other
                    .parse::<f64>()
                    .map_err(|_| de::Error::custom(format!("invalid number: {}", other))),
            },
        }
    }
}
