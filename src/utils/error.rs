use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkerError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("GraphQL error: {message}")]
    GraphqlError { message: String },

    #[error("Channel closed: {context}")]
    ChannelClosed { context: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MarkerError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MarkerError::GraphqlError { .. } => ErrorSeverity::Low,
            MarkerError::ApiError(_) => ErrorSeverity::Medium,
            MarkerError::SerializationError(_) | MarkerError::IoError(_) => ErrorSeverity::High,
            MarkerError::ConfigError { .. } | MarkerError::InvalidConfigValueError { .. } => {
                ErrorSeverity::High
            }
            MarkerError::ChannelClosed { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            MarkerError::ApiError(_) => "Check network connectivity and the GraphQL endpoint, then retry",
            MarkerError::IoError(_) => "Make sure the input file exists and is readable",
            MarkerError::SerializationError(_) => "Input is not valid JSON; re-save the page or response",
            MarkerError::ConfigError { .. } | MarkerError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and run again"
            }
            MarkerError::GraphqlError { .. } => "The marketplace rejected the query; results may be partial",
            MarkerError::ChannelClosed { .. } => "The other context has gone away; reload the page",
        }
    }
}

pub type Result<T> = std::result::Result<T, MarkerError>;
