//! Error types for the twilight refresh flow.
//!
//! None of these reach the device. The flow logs them and either substitutes
//! a default or skips the cycle.

use sundrive_core::{NetworkError, ReqwestErrorExt};
use thiserror::Error;

/// Location service errors
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for LocationError {
    fn from(err: reqwest::Error) -> Self {
        match err.into_network_error() {
            NetworkError::Timeout => Self::Timeout,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Twilight data source errors
#[derive(Debug, Error)]
pub enum TwilightError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("API returned status {0}")]
    ApiStatus(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TwilightError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.into_network_error())
    }
}

/// Cache store errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Device channel errors
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Device channel closed")]
    Closed,
    #[error("Device channel I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Message encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Device rejected message: {0}")]
    Rejected(String),
}
