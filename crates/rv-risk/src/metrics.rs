//! Risk metrics computation.
//!
//! [`RiskMetricsCalculator`] takes the subject's daily closes (and, optionally,
//! a benchmark series) to produce a [`RiskMetrics`] record of one-day tail
//! risk and annualized performance figures.

use serde::{Deserialize, Serialize};
use tracing::debug;

use rv_types::{Confidence, PriceSeries, RiskError, RvResult};

use crate::stats::{
    log_returns, mean, normal_quantile, percentile_linear, std_dev, MIN_RETURN_OBSERVATIONS,
    STD_DDOF, TRADING_DAYS_PER_YEAR,
};

/// Scalar risk statistics for one instrument.
///
/// VaR and CVaR figures are one-day, log-return-space magnitudes: a positive
/// value is a loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub mean_daily_return: f64,
    /// Sample (`n - 1`) standard deviation of daily log-returns.
    pub std_daily_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    #[serde(rename = "VaR_parametric")]
    pub var_parametric: f64,
    #[serde(rename = "VaR_historical")]
    pub var_historical: f64,
    /// Mean loss of returns beyond the historical VaR threshold. `None` when
    /// no return lies strictly beyond it.
    #[serde(rename = "CVaR")]
    pub cvar: Option<f64>,
    /// Zero when annualized volatility is zero.
    #[serde(rename = "Sharpe_ratio")]
    pub sharpe_ratio: f64,
}

/// Stateless calculator for risk metrics.
pub struct RiskMetricsCalculator;

impl RiskMetricsCalculator {
    /// Compute the metric set from the subject's closes.
    ///
    /// The benchmark is accepted so callers need not special-case it, but no
    /// relative figure is derived from it yet.
    pub fn compute(
        subject: &PriceSeries,
        benchmark: Option<&PriceSeries>,
        confidence: Confidence,
    ) -> RvResult<RiskMetrics> {
        if let Some(bench) = benchmark {
            debug!(
                "Benchmark {} supplied with {} closes; no relative metrics computed",
                bench.symbol(),
                bench.len()
            );
        }

        let returns = log_returns(&subject.closes()?);
        Self::compute_from_returns(&returns, confidence)
    }

    /// Compute the metric set from daily log-returns.
    pub fn compute_from_returns(returns: &[f64], confidence: Confidence) -> RvResult<RiskMetrics> {
        if returns.len() < MIN_RETURN_OBSERVATIONS {
            return Err(RiskError::InsufficientData {
                observations: returns.len(),
                required: MIN_RETURN_OBSERVATIONS,
            }
            .into());
        }

        if let Some(bad) = returns.iter().find(|r| !r.is_finite()) {
            return Err(RiskError::Numeric {
                message: format!("non-finite log-return {}", bad),
            }
            .into());
        }

        let mu = mean(returns);
        let sigma = std_dev(returns, STD_DDOF);

        let z = normal_quantile(confidence.tail_probability())?;
        let var_parametric = -(mu + z * sigma);

        let (var_historical, cvar) = Self::historical_var_cvar(returns, confidence);

        let annualized_return = mu * TRADING_DAYS_PER_YEAR;
        let annualized_volatility = sigma * TRADING_DAYS_PER_YEAR.sqrt();
        let sharpe_ratio = if annualized_volatility > 0.0 {
            annualized_return / annualized_volatility
        } else {
            0.0
        };

        Ok(RiskMetrics {
            mean_daily_return: mu,
            std_daily_return: sigma,
            annualized_return,
            annualized_volatility,
            var_parametric,
            var_historical,
            cvar,
            sharpe_ratio,
        })
    }

    /// Historical VaR and CVaR from the empirical return distribution.
    fn historical_var_cvar(returns: &[f64], confidence: Confidence) -> (f64, Option<f64>) {
        let threshold = percentile_linear(returns, confidence.tail_probability() * 100.0);
        let var = -threshold;

        let tail: Vec<f64> = returns.iter().copied().filter(|r| *r < threshold).collect();
        let cvar = if tail.is_empty() {
            None
        } else {
            Some(-mean(&tail))
        };

        (var, cvar)
    }
}
