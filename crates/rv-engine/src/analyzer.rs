use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use rv_data::PriceSeriesProvider;
use rv_risk::{PriceSummary, RiskMetrics, RiskMetricsCalculator};
use rv_types::{validation_error, Confidence, PriceSeries, RvError, RvResult, Symbol};

pub const DEFAULT_BENCHMARK: &str = "SPY";
pub const DEFAULT_WINDOW_DAYS: usize = 90;
pub const DEFAULT_CONFIDENCE: f64 = 0.95;
/// Smallest accepted window. The metrics need `MIN_RETURN_OBSERVATIONS + 1`
/// closes, so a window of 2 passes validation but always ends in
/// `RiskError::InsufficientData`.
pub const MIN_WINDOW_DAYS: usize = 2;
/// Ten years of trading days.
pub const MAX_WINDOW_DAYS: usize = 2520;

fn default_benchmark() -> Option<String> {
    Some(DEFAULT_BENCHMARK.to_string())
}

fn default_days() -> usize {
    DEFAULT_WINDOW_DAYS
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

/// One analysis request.
///
/// A missing `benchmark` defaults to SPY; an explicit `null` or empty string
/// means no benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRequest {
    pub ticker: String,
    #[serde(default = "default_benchmark")]
    pub benchmark: Option<String>,
    #[serde(default = "default_days")]
    pub days: usize,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl RiskRequest {
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            benchmark: default_benchmark(),
            days: DEFAULT_WINDOW_DAYS,
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    pub fn with_benchmark(mut self, benchmark: Option<&str>) -> Self {
        self.benchmark = benchmark.map(str::to_string);
        self
    }

    pub fn with_days(mut self, days: usize) -> Self {
        self.days = days;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    fn validate(&self) -> RvResult<AnalysisParams> {
        let subject = Symbol::new(&self.ticker);
        if subject.as_str().is_empty() {
            return Err(validation_error!("ticker must not be empty"));
        }

        if !(MIN_WINDOW_DAYS..=MAX_WINDOW_DAYS).contains(&self.days) {
            return Err(validation_error!(
                "days must be between {} and {}, got {}",
                MIN_WINDOW_DAYS,
                MAX_WINDOW_DAYS,
                self.days
            ));
        }

        let confidence = Confidence::new(self.confidence)?;

        let benchmark = self
            .benchmark
            .as_deref()
            .map(Symbol::new)
            .filter(|s| !s.as_str().is_empty());

        Ok(AnalysisParams {
            subject,
            benchmark,
            days: self.days,
            confidence,
        })
    }
}

#[derive(Debug)]
struct AnalysisParams {
    subject: Symbol,
    benchmark: Option<Symbol>,
    days: usize,
    confidence: Confidence,
}

/// Output envelope of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub ticker: String,
    pub last_price: f64,
    pub last_date: NaiveDate,
    pub confidence: f64,
    pub window_days: usize,
    pub metrics: RiskMetrics,
    pub price_summary: PriceSummary,
    pub updated_at: DateTime<Utc>,
}

/// Runs the fetch / compute / report pipeline for one request at a time.
#[derive(Debug, Clone)]
pub struct RiskAnalyzer {
    provider: Arc<dyn PriceSeriesProvider>,
}

impl RiskAnalyzer {
    pub fn new(provider: Arc<dyn PriceSeriesProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Analyze one request.
    ///
    /// Subject and benchmark are fetched concurrently. A subject failure ends
    /// the analysis at once and drops the in-flight benchmark fetch; a
    /// benchmark that has no data or cannot be reached is treated as absent.
    pub async fn analyze(&self, request: &RiskRequest) -> RvResult<RiskReport> {
        let params = request.validate()?;
        info!(
            "Analyzing {} over {} days at {} confidence (benchmark: {})",
            params.subject,
            params.days,
            params.confidence,
            params
                .benchmark
                .as_ref()
                .map(|b| b.to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        let (subject, benchmark) = tokio::try_join!(
            self.provider.fetch(&params.subject, params.days),
            self.fetch_benchmark(params.benchmark.as_ref(), params.days),
        )?;

        let metrics =
            RiskMetricsCalculator::compute(&subject, benchmark.as_ref(), params.confidence)?;
        let price_summary = PriceSummary::from_series(&subject)?
            .ok_or_else(|| RvError::Internal(format!("empty series for {}", params.subject)))?;
        let last = subject
            .last()
            .ok_or_else(|| RvError::Internal(format!("empty series for {}", params.subject)))?;
        let last_price = last.close.to_f64().ok_or_else(|| {
            RvError::Internal(format!("close {} not representable as f64", last.close))
        })?;

        Ok(RiskReport {
            ticker: params.subject.to_string(),
            last_price,
            last_date: last.timestamp.date_naive(),
            confidence: params.confidence.value(),
            window_days: params.days,
            metrics,
            price_summary,
            updated_at: Utc::now(),
        })
    }

    async fn fetch_benchmark(
        &self,
        benchmark: Option<&Symbol>,
        days: usize,
    ) -> RvResult<Option<PriceSeries>> {
        let Some(symbol) = benchmark else {
            return Ok(None);
        };

        match self.provider.fetch(symbol, days).await {
            Ok(series) => Ok(Some(series)),
            Err(e) if e.is_benchmark_recoverable() => {
                warn!("Benchmark {} unavailable, continuing without it: {}", symbol, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
