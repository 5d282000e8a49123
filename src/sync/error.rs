//! Error types for the synchronization module

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Unsupported grammar, bad token prefix, zero budgets and similar setup mistakes.
    /// Raised at construction time, never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider rejected the bearer token (HTTP 401)
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Provider does not support the requested target locale (HTTP 400)
    #[error("Unsupported locale '{locale}': {message}")]
    UnsupportedLocale { locale: String, message: String },

    /// Network-level failure talking to the provider
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider answered with a status outside the documented contract
    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// Provider answered 200 but the body did not carry what we asked for
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// A neutral token could not be mapped back to a native fragment
    #[error("Normalization error for '{key}': {message}")]
    Normalization { key: String, message: String },

    /// Neither the locale nor the default locale captured fragments for this key
    #[error("No order table for key '{key}' in locale '{locale}' or the default locale")]
    MissingOrderTable { locale: String, key: String },

    #[error("Invalid locale: {0}")]
    InvalidLocale(String),

    /// Cancellation was observed at a dispatch boundary
    #[error("Synchronization aborted")]
    Aborted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SyncError {
    /// Aborts are the caller's own doing and are not real failures
    pub fn is_aborted(&self) -> bool {
        matches!(self, SyncError::Aborted)
    }

    /// Only transport failures are worth retrying; this layer never does it itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::MalformedResponse(err.to_string())
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

/// Result type for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;
