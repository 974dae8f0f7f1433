//! Shared plumbing for the Sundrive companion: configuration, error types
//! and logging setup.

pub mod config;
pub mod error;

pub use config::{
    CacheConfig, Config, LocationConfig, LocationProviderKind, LoggingConfig, TwilightConfig,
    ValidationResult,
};
pub use error::{ConfigError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize logging.
///
/// `RUST_LOG` wins over `default_filter`. Output goes to stderr because
/// stdout carries the device channel.
pub fn init(default_filter: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("Sundrive core initialized");
    Ok(())
}
