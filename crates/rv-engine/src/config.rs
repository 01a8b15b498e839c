//! Service configuration from environment variables.

use std::time::Duration;

use rv_data::DataSourceConfig;
use rv_types::{config_error, RvResult};

use crate::service::DEFAULT_READ_TIMEOUT_SECS;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: String,
    /// Time a client gets to deliver a complete request.
    pub read_timeout: Duration,
    pub data_source: DataSourceConfig,
}

impl ServiceConfig {
    pub fn from_env() -> RvResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> RvResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("RISKVISION_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let read_timeout_secs = match lookup("RISKVISION_READ_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| {
                    config_error!("RISKVISION_READ_TIMEOUT_SECS must be positive, got '{}'", raw)
                })?,
            None => DEFAULT_READ_TIMEOUT_SECS,
        };

        let data_source = DataSourceConfig::from_lookup(lookup)?;

        Ok(Self {
            bind_addr,
            read_timeout: Duration::from_secs(read_timeout_secs),
            data_source,
        })
    }
}
