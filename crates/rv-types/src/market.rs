use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{DataError, RiskError};

/// Ticker symbol, normalized to trimmed upper-case
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol {
    pub ticker: String,
}

impl Symbol {
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.trim().to_uppercase(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.ticker
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ticker)
    }
}

/// A single daily close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: Decimal,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, close: Decimal) -> Self {
        Self { timestamp, close }
    }
}

/// Time-ordered daily closing prices for one symbol.
///
/// Timestamps are strictly increasing and every close is positive; both are
/// checked at construction. The series is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: Symbol,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: Symbol, points: Vec<PricePoint>) -> Result<Self, DataError> {
        if let Some(bad) = points.iter().find(|p| p.close <= Decimal::ZERO) {
            return Err(DataError::InvalidSeries {
                message: format!(
                    "non-positive close {} for {} at {}",
                    bad.close,
                    symbol,
                    bad.timestamp.to_rfc3339()
                ),
            });
        }

        if let Some(pair) = points.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(DataError::InvalidSeries {
                message: format!(
                    "timestamps for {} not strictly increasing: {} followed by {}",
                    symbol,
                    pair[0].timestamp.to_rfc3339(),
                    pair[1].timestamp.to_rfc3339()
                ),
            });
        }

        Ok(Self { symbol, points })
    }

    /// Keep only the most recent `n` observations.
    pub fn tail(mut self, n: usize) -> Self {
        if self.points.len() > n {
            let start = self.points.len() - n;
            self.points.drain(..start);
        }
        self
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Closing prices at the f64 boundary used by the statistics code.
    ///
    /// Fails rather than skipping a point, so returns stay aligned with dates.
    pub fn closes(&self) -> Result<Vec<f64>, DataError> {
        self.points
            .iter()
            .map(|p| {
                p.close
                    .to_f64()
                    .filter(|c| c.is_finite())
                    .ok_or_else(|| DataError::InvalidSeries {
                        message: format!(
                            "close {} for {} at {} is not representable as f64",
                            p.close,
                            self.symbol,
                            p.timestamp.to_rfc3339()
                        ),
                    })
            })
            .collect()
    }
}

/// Confidence level for tail statistics, strictly inside (0, 1).
///
/// Both the level and its tail probability `1 - c` must be strictly inside
/// (0, 1) in f64, so levels within rounding distance of 0 are rejected too.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(value: f64) -> Result<Self, RiskError> {
        let tail = 1.0 - value;
        if value > 0.0 && value < 1.0 && tail > 0.0 && tail < 1.0 {
            Ok(Self(value))
        } else {
            Err(RiskError::InvalidConfidence { confidence: value })
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Probability mass in the loss tail, `1 - confidence`.
    pub fn tail_probability(&self) -> f64 {
        1.0 - self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = RiskError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Confidence::new(value).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
