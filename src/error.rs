//! Error types for loadmix
//!
//! Two families:
//! - [`AppError`]: setup and configuration failures. Fatal, surfaced before any traffic is sent.
//! - [`RequestError`]: a single iteration's request failed. Counted, logged, never retried.

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file '{path}': {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid duration '{input}': {reason}")]
    InvalidDuration { input: String, reason: String },

    #[error("Invalid threshold '{input}': {reason}")]
    InvalidThreshold { input: String, reason: String },

    #[error("Endpoint table is empty: at least one [[endpoints]] entry is required")]
    EmptyEndpointTable,

    #[error("Endpoint '{target}' has invalid weight {weight}. Weight must be a positive finite number.")]
    InvalidWeight { target: String, weight: f64 },

    #[error("Endpoint target '{target}' is invalid: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

/// Failure of a single generated request
///
/// These never abort a run. The virtual user records the failure and
/// moves on to its pause.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Request to {target} timed out after {timeout_ms}ms")]
    Timeout { target: String, timeout_ms: u64 },

    #[error("Request to {target} failed: {reason}")]
    Transport { target: String, reason: String },

    #[error("Request to {target} returned HTTP {status}")]
    Status { target: String, status: u16 },
}

impl RequestError {
    /// Short, bounded label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Transport { .. } => "transport",
            Self::Status { .. } => "status",
        }
    }

    /// Target URL the failed request was sent to
    pub fn target(&self) -> &str {
        match self {
            Self::Timeout { target, .. }
            | Self::Transport { target, .. }
            | Self::Status { target, .. } => target,
        }
    }
}
