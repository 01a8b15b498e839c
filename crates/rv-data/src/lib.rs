pub mod finnhub;
pub mod providers;
pub mod sources;

pub use finnhub::*;
pub use providers::*;
pub use sources::*;

use std::sync::Arc;

use rv_types::RvResult;

/// Build the provider selected by configuration.
pub fn build_provider(source: &DataSourceConfig) -> RvResult<Arc<dyn PriceSeriesProvider>> {
    match source {
        DataSourceConfig::Finnhub(config) => Ok(Arc::new(FinnhubProvider::new(config.clone())?)),
        DataSourceConfig::Csv { data_directory } => {
            Ok(Arc::new(CsvDataProvider::new(data_directory)))
        }
    }
}
