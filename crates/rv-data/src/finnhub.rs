use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rv_types::{
    config_error, validation_error, DataError, PricePoint, PriceSeries, RvError, RvResult, Symbol,
};
use serde::Deserialize;

use crate::providers::PriceSeriesProvider;
use crate::sources::FinnhubConfig;

/// Calendar days requested per trading day asked for, to absorb weekends and
/// holidays.
pub const CALENDAR_WINDOW_FACTOR: f64 = 1.5;

const DAILY_RESOLUTION: &str = "D";
const STATUS_OK: &str = "ok";
const STATUS_NO_DATA: &str = "no_data";

/// Body of `GET /stock/candle`
#[derive(Debug, Deserialize)]
struct CandleResponse {
    s: Option<String>,
    #[serde(default)]
    c: Vec<f64>,
    #[serde(default)]
    t: Vec<i64>,
    error: Option<String>,
}

/// Finnhub daily candle provider
#[derive(Debug)]
pub struct FinnhubProvider {
    pub name: String,
    config: FinnhubConfig,
    client: reqwest::Client,
}

impl FinnhubProvider {
    pub fn new(config: FinnhubConfig) -> RvResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| config_error!("Failed to build HTTP client: {}", e))?;

        Ok(Self::with_client(config, client))
    }

    /// Use a caller-built client; the configured timeout is still enforced
    /// around every fetch.
    pub fn with_client(config: FinnhubConfig, client: reqwest::Client) -> Self {
        Self {
            name: "Finnhub".to_string(),
            config,
            client,
        }
    }

    /// Calendar window `[from, to]` covering `lookback_days` trading days.
    ///
    /// Fails when the window start falls outside the representable date range.
    pub fn calendar_window(
        lookback_days: usize,
        to: DateTime<Utc>,
    ) -> RvResult<(DateTime<Utc>, DateTime<Utc>)> {
        let calendar_days = (lookback_days as f64 * CALENDAR_WINDOW_FACTOR).ceil();
        let from = Some(calendar_days)
            .filter(|days| *days < i64::MAX as f64)
            .and_then(|days| Duration::try_days(days as i64))
            .and_then(|span| to.checked_sub_signed(span))
            .ok_or_else(|| validation_error!("lookback of {} days is out of range", lookback_days));

        from.map(|from| (from, to))
    }

    fn timeout_secs(&self) -> u64 {
        self.config.timeout.as_secs()
    }

    fn transport_error(&self, symbol: &Symbol, err: reqwest::Error) -> RvError {
        if err.is_timeout() {
            DataError::Timeout {
                symbol: symbol.to_string(),
                timeout_secs: self.timeout_secs(),
            }
            .into()
        } else {
            DataError::Transport {
                symbol: symbol.to_string(),
                message: format!("HTTP request failed: {}", err),
            }
            .into()
        }
    }

    async fn request_candles(
        &self,
        symbol: &Symbol,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RvResult<CandleResponse> {
        let url = format!("{}/stock/candle", self.config.base_url);
        let from = from.timestamp().to_string();
        let to = to.timestamp().to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol.as_str()),
                ("resolution", DAILY_RESOLUTION),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("token", self.config.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.transport_error(symbol, e))?;

        if !response.status().is_success() {
            return Err(DataError::Transport {
                symbol: symbol.to_string(),
                message: format!("HTTP error: {}", response.status()),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(symbol, e))?;

        serde_json::from_str(&body).map_err(|e| {
            DataError::ParseError {
                message: format!("Failed to parse candle response for {}: {}", symbol, e),
            }
            .into()
        })
    }

    /// Validate the status field and turn the parallel arrays into points.
    fn parse_candles(symbol: &Symbol, response: CandleResponse) -> RvResult<Vec<PricePoint>> {
        match response.s.as_deref() {
            Some(STATUS_OK) => {}
            Some(STATUS_NO_DATA) => {
                return Err(DataError::NoData {
                    symbol: symbol.to_string(),
                    reason: "upstream status no_data".to_string(),
                }
                .into());
            }
            Some(other) => {
                return Err(DataError::UnexpectedStatus {
                    symbol: symbol.to_string(),
                    status: other.to_string(),
                }
                .into());
            }
            None => {
                return Err(DataError::UnexpectedStatus {
                    symbol: symbol.to_string(),
                    status: response
                        .error
                        .unwrap_or_else(|| "missing status field".to_string()),
                }
                .into());
            }
        }

        if response.c.len() != response.t.len() {
            return Err(DataError::ParseError {
                message: format!(
                    "{} closes but {} timestamps for {}",
                    response.c.len(),
                    response.t.len(),
                    symbol
                ),
            }
            .into());
        }

        if response.c.is_empty() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
                reason: "status ok with empty series".to_string(),
            }
            .into());
        }

        let mut points = response
            .t
            .iter()
            .zip(response.c.iter())
            .map(|(&ts, &close)| -> Result<PricePoint, DataError> {
                let timestamp =
                    DateTime::<Utc>::from_timestamp(ts, 0).ok_or_else(|| DataError::ParseError {
                        message: format!("Invalid timestamp {} for {}", ts, symbol),
                    })?;
                let close = Decimal::from_f64(close).ok_or_else(|| DataError::ParseError {
                    message: format!("Close {} for {} is not a representable price", close, symbol),
                })?;
                Ok(PricePoint::new(timestamp, close))
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(points)
    }
}

#[async_trait]
impl PriceSeriesProvider for FinnhubProvider {
    async fn fetch(&self, symbol: &Symbol, lookback_days: usize) -> RvResult<PriceSeries> {
        let (from, to) = Self::calendar_window(lookback_days, Utc::now())?;
        tracing::info!(
            "Fetching {} daily closes for {} from Finnhub ({} to {})",
            lookback_days,
            symbol,
            from.date_naive(),
            to.date_naive()
        );

        let request = self.request_candles(symbol, from, to);
        let response = tokio::time::timeout(self.config.timeout, request)
            .await
            .map_err(|_| DataError::Timeout {
                symbol: symbol.to_string(),
                timeout_secs: self.timeout_secs(),
            })??;

        let points = Self::parse_candles(symbol, response)?;
        let series = PriceSeries::new(symbol.clone(), points)?.tail(lookback_days);

        tracing::info!("Retrieved {} closes from Finnhub for {}", series.len(), symbol);
        Ok(series)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "finnhub",
            "base_url": self.config.base_url,
            "timeout_secs": self.timeout_secs(),
            "api_key_set": !self.config.api_key.is_empty()
        })
    }
}
