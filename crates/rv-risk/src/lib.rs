//! Risk metrics for a single instrument over a trailing window of daily closes.
//!
//! Provides:
//! - Log-return construction and the pinned statistical conventions
//! - Parametric and historical VaR, historical CVaR (expected shortfall)
//! - Annualized return, volatility and Sharpe ratio
//! - A price-level summary of the observed window

pub mod metrics;
pub mod stats;
pub mod summary;

pub use metrics::{RiskMetrics, RiskMetricsCalculator};
pub use stats::{MIN_RETURN_OBSERVATIONS, STD_DDOF, TRADING_DAYS_PER_YEAR};
pub use summary::PriceSummary;
