//! Core error types for Tally

use thiserror::Error;

/// Result type alias for Tally operations
pub type TallyResult<T> = Result<T, TallyError>;

/// Main error type for Tally
#[derive(Error, Debug, Clone)]
pub enum TallyError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Key-value store errors
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        context: Option<String>,
    },

    /// Topic mapping and comparability assessment errors
    #[error("Compatibility error: {message}")]
    Compatibility {
        message: String,
        context: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        context: Option<String>,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
        context: Option<String>,
    },

    /// HTTP errors from identification and loading services
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        url: Option<String>,
        status_code: Option<u16>,
        context: Option<String>,
    },
}

impl TallyError {
    /// Get the error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "TALLY_CONFIG",
            Self::Storage { .. } => "TALLY_STORAGE",
            Self::Compatibility { .. } => "TALLY_COMPATIBILITY",
            Self::Json { .. } => "TALLY_JSON",
            Self::Io { .. } => "TALLY_IO",
            Self::Http { .. } => "TALLY_HTTP",
        }
    }

    /// Get the human-readable error message
    pub fn message(&self) -> &str {
        match self {
            Self::Config { message, .. }
            | Self::Storage { message, .. }
            | Self::Compatibility { message, .. }
            | Self::Json { message, .. }
            | Self::Io { message, .. }
            | Self::Http { message, .. } => message,
        }
    }

    /// Get optional context about the error
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Config { context, .. }
            | Self::Storage { context, .. }
            | Self::Compatibility { context, .. }
            | Self::Json { context, .. }
            | Self::Io { context, .. }
            | Self::Http { context, .. } => context.as_deref(),
        }
    }
}
