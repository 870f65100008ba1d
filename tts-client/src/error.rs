//! Error types for TTS providers
//!
//! Every provider failure is classified into one of three kinds so callers
//! can decide whether (and how long) to wait before retrying:
//! rate-limited, transient, or permanent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TtsError>;

/// Errors from TTS providers
#[derive(Debug, Clone, Error)]
pub enum TtsError {
    /// The service is throttling requests
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    /// One-off failure (network blip, server error, timeout) worth retrying
    #[error("Transient error: {message}")]
    Transient { message: String },

    /// Retrying cannot help (bad voice, rejected input)
    #[error("Permanent error: {message}")]
    Permanent { message: String },

    /// API key not found in environment
    #[error("{provider} API key not found. Set the {env_var} environment variable.")]
    MissingApiKey { provider: String, env_var: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Classification of a provider failure, used by retry policies and
/// persisted in job outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    RateLimited,
    Transient,
    Permanent,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::RateLimited => write!(f, "RateLimited"),
            ErrorKind::Transient => write!(f, "Transient"),
            ErrorKind::Permanent => write!(f, "Permanent"),
        }
    }
}

impl TtsError {
    /// Classify this error for retry decisions.
    ///
    /// Setup errors (missing key, bad config) are permanent: they fail the
    /// same way on every attempt.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TtsError::RateLimited { .. } => ErrorKind::RateLimited,
            TtsError::Transient { .. } => ErrorKind::Transient,
            TtsError::Permanent { .. }
            | TtsError::MissingApiKey { .. }
            | TtsError::ConfigError(_) => ErrorKind::Permanent,
        }
    }

    /// Map an HTTP status from a synthesis endpoint to a classified error.
    ///
    /// 429 means the service is throttling us. 408 and 5xx are one-off
    /// server-side failures. Any other non-success status is a request the
    /// service has rejected outright, so retrying is pointless.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            429 => TtsError::RateLimited { message },
            408 => TtsError::Transient { message },
            s if s >= 500 => TtsError::Transient { message },
            _ => TtsError::Permanent { message },
        }
    }
}
