use thiserror::Error;

/// Main error type for the RiskVision system
#[derive(Error, Debug)]
pub enum RvError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Risk error: {0}")]
    Risk(#[from] RiskError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl RvError {
    /// True when upstream had nothing for the symbol/window.
    pub fn is_no_data(&self) -> bool {
        matches!(self, RvError::Data(e) if e.is_no_data())
    }

    /// True for network, timeout and unexpected-status failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, RvError::Data(e) if e.is_transport())
    }

    /// Whether a failed benchmark fetch may be replaced by "no benchmark".
    ///
    /// Only the no-data and transport families qualify; parse failures,
    /// invalid series and everything else propagate so genuine bugs are not
    /// masked.
    pub fn is_benchmark_recoverable(&self) -> bool {
        self.is_no_data() || self.is_transport()
    }
}

/// Data-related errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No data available for symbol {symbol}: {reason}")]
    NoData { symbol: String, reason: String },

    #[error("Transport failure fetching {symbol}: {message}")]
    Transport { symbol: String, message: String },

    #[error("Request for {symbol} timed out after {timeout_secs} seconds")]
    Timeout { symbol: String, timeout_secs: u64 },

    #[error("Unexpected upstream status '{status}' for {symbol}")]
    UnexpectedStatus { symbol: String, status: String },

    #[error("Data parsing error: {message}")]
    ParseError { message: String },

    #[error("Invalid price series: {message}")]
    InvalidSeries { message: String },
}

impl DataError {
    pub fn is_no_data(&self) -> bool {
        matches!(self, DataError::NoData { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DataError::Transport { .. }
                | DataError::Timeout { .. }
                | DataError::UnexpectedStatus { .. }
        )
    }
}

/// Risk computation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("Insufficient data: {observations} return observations, at least {required} required")]
    InsufficientData { observations: usize, required: usize },

    #[error("Invalid confidence level {confidence}: must lie strictly between 0 and 1")]
    InvalidConfidence { confidence: f64 },

    #[error("Numeric error: {message}")]
    Numeric { message: String },
}

/// Result type alias for RiskVision operations
pub type RvResult<T> = Result<T, RvError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::RvError::Validation(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::RvError::Config(format!($($arg)*))
    };
}
