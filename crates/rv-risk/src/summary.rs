//! Price-level view of the observed window.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use rv_types::{PriceSeries, RvResult};

use crate::stats::{mean, std_dev, STD_DDOF};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub observations: usize,
    pub mean_close: f64,
    /// `(last - first) / first * 100`
    pub change_pct: f64,
    /// Sample standard deviation of closes; 0 with a single close.
    pub close_std: f64,
}

impl PriceSummary {
    /// `None` for an empty series.
    pub fn from_series(series: &PriceSeries) -> RvResult<Option<Self>> {
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Ok(None);
        };
        let closes = series.closes()?;

        let (Some(&first_close), Some(&last_close)) = (closes.first(), closes.last()) else {
            return Ok(None);
        };

        let close_std = if closes.len() > STD_DDOF {
            std_dev(&closes, STD_DDOF)
        } else {
            0.0
        };

        Ok(Some(Self {
            start_date: first.timestamp.date_naive(),
            end_date: last.timestamp.date_naive(),
            observations: closes.len(),
            mean_close: mean(&closes),
            change_pct: (last_close - first_close) / first_close * 100.0,
            close_std,
        }))
    }
}
