use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Error type shared by the acquisition, extraction and synthesis pipeline
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (permanent failures)
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    // I/O errors (potentially transient)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors (usually permanent)
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    // Network errors (transient)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Timeout error: operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    // Client errors (permanent)
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    // Tool input files
    #[error("{label} not found: {}", path.display())]
    MissingInput { label: &'static str, path: PathBuf },

    #[error("Malformed file {}: {reason}", path.display())]
    MalformedFile { path: PathBuf, reason: String },

    // Document text could not be read
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    // External utility missing from PATH
    #[error("External tool unavailable: {0}")]
    ToolUnavailable(String),

    // General service error
    #[error("Service error: {0}")]
    Service(String),

    // Provider errors
    #[error("Provider error: {0}")]
    Provider(String),
}

/// How a failure should be treated by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Provider hiccup, the orchestrator moves on to the next resolver
    Transient,
    /// A tool input file is absent, reported as an error payload
    MissingInput,
    /// Retrying will not help
    Permanent,
}

impl Error {
    /// Categorize the error for tool boundaries and resolver fallthrough
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingInput { .. } => ErrorCategory::MissingInput,

            Self::Config(_)
            | Self::InvalidInput { .. }
            | Self::MalformedFile { .. }
            | Self::Parse { .. }
            | Self::Serde(_) => ErrorCategory::Permanent,

            Self::Http(_)
            | Self::Timeout { .. }
            | Self::Io(_)
            | Self::ToolUnavailable(_)
            | Self::Service(_)
            | Self::Provider(_) => ErrorCategory::Transient,
        }
    }

    /// Whether a provider failure should simply fall through to the next resolver
    pub fn is_soft_failure(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    /// JSON object carrying an `error` field, as returned at tool boundaries
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }

    /// Log `operation`'s failure at the level its category warrants, then
    /// hand back the error payload
    pub fn report(&self, operation: &str) -> serde_json::Value {
        match self.category() {
            ErrorCategory::MissingInput => info!("{} skipped: {}", operation, self),
            ErrorCategory::Transient => warn!("{} failed: {}", operation, self),
            ErrorCategory::Permanent => error!("{} failed: {}", operation, self),
        }
        self.to_payload()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<crate::client::providers::ProviderError> for Error {
    fn from(err: crate::client::providers::ProviderError) -> Self {
        use crate::client::providers::ProviderError;
        match err {
            ProviderError::Network(msg) => Self::Provider(format!("Network error: {msg}")),
            ProviderError::Status(code) => Self::Provider(format!("HTTP status {code}")),
            ProviderError::Parse(msg) => Self::Parse {
                context: "provider".to_string(),
                message: msg,
            },
            ProviderError::Timeout(timeout) => Self::Timeout { timeout },
            ProviderError::ToolUnavailable(tool) => Self::ToolUnavailable(tool),
            ProviderError::Other(msg) => Self::Provider(msg),
        }
    }
}
