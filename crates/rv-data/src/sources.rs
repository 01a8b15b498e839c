use rv_types::{config_error, RvResult};
use std::path::PathBuf;
use std::time::Duration;

pub const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Hard bound on a single upstream call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

pub const DEFAULT_DATA_DIR: &str = "./data";

/// Finnhub connection settings
#[derive(Clone)]
pub struct FinnhubConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl FinnhubConfig {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: FINNHUB_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_env() -> RvResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, map in tests, ...).
    pub fn from_lookup<F>(lookup: F) -> RvResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("FINNHUB_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| config_error!("FINNHUB_API_KEY must be set"))?;

        let mut config = Self::new(api_key.trim());

        if let Some(base_url) = lookup("FINNHUB_BASE_URL") {
            config = config.with_base_url(&base_url);
        }

        if let Some(raw) = lookup("FINNHUB_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| {
                    config_error!("FINNHUB_TIMEOUT_SECS must be a positive integer, got '{}'", raw)
                })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

impl std::fmt::Debug for FinnhubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinnhubConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Which price source backs the analyzer
#[derive(Debug, Clone)]
pub enum DataSourceConfig {
    Finnhub(FinnhubConfig),
    Csv { data_directory: PathBuf },
}

impl DataSourceConfig {
    pub fn from_env() -> RvResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> RvResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = lookup("RISKVISION_PROVIDER").unwrap_or_else(|| "finnhub".to_string());

        match kind.trim().to_lowercase().as_str() {
            "finnhub" => Ok(DataSourceConfig::Finnhub(FinnhubConfig::from_lookup(lookup)?)),
            "csv" => {
                let dir = lookup("RISKVISION_DATA_DIR")
                    .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
                Ok(DataSourceConfig::Csv {
                    data_directory: PathBuf::from(dir),
                })
            }
            other => Err(config_error!("Unknown RISKVISION_PROVIDER '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn finnhub_defaults() {
        let config = FinnhubConfig::from_lookup(lookup(&[("FINNHUB_API_KEY", "abc")])).unwrap();
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.base_url, FINNHUB_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(20));
    }

    #[test]
    fn finnhub_overrides() {
        let config = FinnhubConfig::from_lookup(lookup(&[
            ("FINNHUB_API_KEY", "abc"),
            ("FINNHUB_BASE_URL", "http://localhost:9000/api/"),
            ("FINNHUB_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:9000/api");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn finnhub_requires_key() {
        let err = FinnhubConfig::from_lookup(lookup(&[("FINNHUB_API_KEY", "  ")])).unwrap_err();
        assert!(err.to_string().contains("FINNHUB_API_KEY"));
    }

    #[test]
    fn finnhub_rejects_zero_timeout() {
        let err = FinnhubConfig::from_lookup(lookup(&[
            ("FINNHUB_API_KEY", "abc"),
            ("FINNHUB_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("FINNHUB_TIMEOUT_SECS"));
    }

    #[test]
    fn debug_redacts_key() {
        let config = FinnhubConfig::new("super-secret");
        assert!(!format!("{:?}", config).contains("super-secret"));
    }

    #[test]
    fn source_selection() {
        let csv = DataSourceConfig::from_lookup(lookup(&[
            ("RISKVISION_PROVIDER", "CSV"),
            ("RISKVISION_DATA_DIR", "/srv/prices"),
        ]))
        .unwrap();
        assert!(matches!(
            csv,
            DataSourceConfig::Csv { ref data_directory }
                if data_directory == &PathBuf::from("/srv/prices")
        ));

        let finnhub = DataSourceConfig::from_lookup(lookup(&[("FINNHUB_API_KEY", "abc")])).unwrap();
        assert!(matches!(finnhub, DataSourceConfig::Finnhub(_)));

        let unknown = DataSourceConfig::from_lookup(lookup(&[("RISKVISION_PROVIDER", "yahoo")]));
        assert!(unknown.is_err());
    }
}
