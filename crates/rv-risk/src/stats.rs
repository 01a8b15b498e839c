//! Return statistics with explicitly pinned conventions.

use rv_types::RiskError;
use statrs::distribution::{ContinuousCDF, Normal};

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Delta degrees of freedom for the standard deviation (unbiased `n - 1`).
pub const STD_DDOF: usize = 1;

/// Fewest log-returns for which metrics are computed.
pub const MIN_RETURN_OBSERVATIONS: usize = 2;

/// `r[i] = ln(p[i]) - ln(p[i-1])`
pub fn log_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| w[1].ln() - w[0].ln()).collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with `ddof` delta degrees of freedom. NaN when
/// `values.len() <= ddof`.
pub fn std_dev(values: &[f64], ddof: usize) -> f64 {
    if values.len() <= ddof {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - ddof) as f64).sqrt()
}

/// `q`-th percentile (`0..=100`) by linear interpolation between the two
/// closest ranks, rank = `q / 100 * (n - 1)`.
pub fn percentile_linear(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Inverse standard-normal CDF.
pub fn normal_quantile(p: f64) -> Result<f64, RiskError> {
    let normal = Normal::new(0.0, 1.0).map_err(|e| RiskError::Numeric {
        message: format!("standard normal unavailable: {}", e),
    })?;
    let z = if p > 0.0 && p < 1.0 { normal.inverse_cdf(p) } else { f64::NAN };
    if z.is_finite() {
        Ok(z)
    } else {
        Err(RiskError::Numeric {
            message: format!("normal quantile undefined at p = {}", p),
        })
    }
}
