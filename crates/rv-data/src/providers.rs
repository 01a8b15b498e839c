use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use csv::ReaderBuilder;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rv_types::{DataError, PricePoint, PriceSeries, RvResult, Symbol};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Source of daily closing prices (HTTP APIs, local files, ...)
#[async_trait]
pub trait PriceSeriesProvider: Send + Sync + std::fmt::Debug {
    /// Fetch the most recent `lookback_days` daily closes for `symbol`.
    ///
    /// Returns fewer observations when the source has less history. Fails with
    /// `DataError::NoData` when the source has nothing usable for the symbol.
    async fn fetch(&self, symbol: &Symbol, lookback_days: usize) -> RvResult<PriceSeries>;

    /// Get provider name
    fn name(&self) -> &str;

    /// Get provider configuration, credentials redacted
    fn config(&self) -> serde_json::Value;
}

/// CSV provider reading one `date,close` file per symbol
#[derive(Debug)]
pub struct CsvDataProvider {
    pub name: String,
    pub data_directory: PathBuf,
    pub file_pattern: String,
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date")]
    timestamp: String,
    #[serde(alias = "Close", alias = "close")]
    close: f64,
}

impl CsvDataProvider {
    pub fn new<P: AsRef<Path>>(data_directory: P) -> Self {
        Self {
            name: "CSV Provider".to_string(),
            data_directory: data_directory.as_ref().to_path_buf(),
            file_pattern: "{symbol}.csv".to_string(),
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.file_pattern = pattern.to_string();
        self
    }

    fn file_path(&self, symbol: &Symbol) -> PathBuf {
        let filename = self.file_pattern.replace("{symbol}", symbol.as_str());
        self.data_directory.join(filename)
    }

    fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DataError> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }

        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or_else(|| DataError::ParseError {
                message: format!("Date parsing error: unrecognised timestamp '{}'", raw),
            })
    }

    fn read_points(&self, path: &Path) -> RvResult<Vec<PricePoint>> {
        let file = std::fs::File::open(path)?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

        let mut points = Vec::new();
        for result in reader.deserialize() {
            let record: CsvRecord = result.map_err(|e| DataError::ParseError {
                message: format!("CSV parsing error: {}", e),
            })?;

            let timestamp = Self::parse_timestamp(&record.timestamp)?;
            let close = Decimal::from_f64(record.close).ok_or_else(|| DataError::ParseError {
                message: format!("Close '{}' is not a representable price", record.close),
            })?;

            points.push(PricePoint::new(timestamp, close));
        }

        points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(points)
    }
}

#[async_trait]
impl PriceSeriesProvider for CsvDataProvider {
    async fn fetch(&self, symbol: &Symbol, lookback_days: usize) -> RvResult<PriceSeries> {
        let path = self.file_path(symbol);

        if !path.exists() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
                reason: format!("no price file at {}", path.to_string_lossy()),
            }
            .into());
        }

        let points = self.read_points(&path)?;
        if points.is_empty() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
                reason: format!("price file {} has no rows", path.to_string_lossy()),
            }
            .into());
        }

        let series = PriceSeries::new(symbol.clone(), points)?.tail(lookback_days);
        tracing::debug!("Loaded {} closes for {} from {}", series.len(), symbol, path.display());
        Ok(series)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "csv",
            "directory": self.data_directory,
            "pattern": self.file_pattern
        })
    }
}
