use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "SUNDRIVE_CONFIG";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a single-line summary of all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the config file and the twilight cache
    pub config_dir: PathBuf,

    /// Twilight data source settings
    #[serde(default)]
    pub twilight: TwilightConfig,

    /// Location resolution settings
    #[serde(default)]
    pub location: LocationConfig,

    /// Cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilightConfig {
    /// Endpoint of the sunrise-sunset JSON API
    #[serde(default = "default_twilight_api_url")]
    pub api_url: String,

    /// Request timeout. `None` leaves it to the HTTP transport.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Deliver the built-in example dataset instead of refreshing
    #[serde(default)]
    pub test_mode: bool,
}

fn default_twilight_api_url() -> String {
    "https://api.sunrise-sunset.org/json".to_string()
}

impl Default for TwilightConfig {
    fn default() -> Self {
        Self {
            api_url: default_twilight_api_url(),
            request_timeout_secs: None,
            test_mode: false,
        }
    }
}

/// Where the current position comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationProviderKind {
    /// Coordinates from `location.latitude` / `location.longitude`
    Fixed,
    /// Approximate position looked up from the public IP address
    #[default]
    Ip,
    /// No provider; always use the fallback coordinates
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub provider: LocationProviderKind,

    /// Fixed latitude (provider = "fixed")
    #[serde(default)]
    pub latitude: Option<f64>,

    /// Fixed longitude (provider = "fixed")
    #[serde(default)]
    pub longitude: Option<f64>,

    /// IP geolocation endpoint (provider = "ip")
    #[serde(default = "default_ip_api_url")]
    pub ip_api_url: String,

    /// Upper bound on a single location query
    #[serde(default = "default_location_timeout")]
    pub timeout_secs: u64,

    /// A previously resolved position younger than this is reused
    #[serde(default = "default_maximum_age")]
    pub maximum_age_secs: u64,

    /// Used whenever the provider fails
    #[serde(default = "default_fallback_latitude")]
    pub fallback_latitude: f64,

    #[serde(default = "default_fallback_longitude")]
    pub fallback_longitude: f64,
}

fn default_ip_api_url() -> String {
    "http://ip-api.com/json".to_string()
}

fn default_location_timeout() -> u64 {
    15
}

fn default_maximum_age() -> u64 {
    60
}

// Zaragoza, Spain
fn default_fallback_latitude() -> f64 {
    41.65606
}

fn default_fallback_longitude() -> f64 {
    -0.87734
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            provider: LocationProviderKind::default(),
            latitude: None,
            longitude: None,
            ip_api_url: default_ip_api_url(),
            timeout_secs: default_location_timeout(),
            maximum_age_secs: default_maximum_age(),
            fallback_latitude: default_fallback_latitude(),
            fallback_longitude: default_fallback_longitude(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// File name of the single-slot twilight cache inside `config_dir`
    #[serde(default = "default_cache_file_name")]
    pub file_name: String,
}

fn default_cache_file_name() -> String {
    "twilight_cache.json".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file_name: default_cache_file_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sundrive");

        Self {
            config_dir,
            twilight: TwilightConfig::default(),
            location: LocationConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            if let Some(parent) = path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation finds errors; warnings are logged.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.check()?;
        Ok((config, validation))
    }

    /// Validate, failing on errors and logging warnings
    pub fn check(&self) -> Result<ValidationResult> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(validation)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_url(&self.twilight.api_url, "twilight.api_url", &mut result);

        if self.twilight.request_timeout_secs == Some(0) {
            result.add_error(
                "twilight.request_timeout_secs",
                "Timeout must be greater than 0 (omit it to use the transport default)",
            );
        }

        if self.twilight.test_mode {
            result.add_warning(
                "twilight.test_mode",
                "Test mode enabled - example data will be sent instead of live data",
            );
        }

        match self.location.provider {
            LocationProviderKind::Fixed => match (self.location.latitude, self.location.longitude) {
                (Some(lat), Some(lng)) => {
                    validate_coordinates(lat, lng, "location", &mut result);
                }
                _ => result.add_error(
                    "location",
                    "Fixed provider requires both latitude and longitude",
                ),
            },
            LocationProviderKind::Ip => {
                validate_url(&self.location.ip_api_url, "location.ip_api_url", &mut result);
            }
            LocationProviderKind::None => {
                result.add_warning(
                    "location.provider",
                    "No location provider - fallback coordinates will always be used",
                );
            }
        }

        validate_coordinates(
            self.location.fallback_latitude,
            self.location.fallback_longitude,
            "location.fallback",
            &mut result,
        );

        if self.location.timeout_secs == 0 {
            result.add_error("location.timeout_secs", "Timeout must be greater than 0");
        }

        if self.cache.file_name.trim().is_empty() {
            result.add_error("cache.file_name", "Cache file name cannot be empty");
        }

        result
    }

    /// Full path of the twilight cache file
    pub fn cache_path(&self) -> PathBuf {
        self.config_dir.join(&self.cache.file_name)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("sundrive");

        Ok(config_dir.join("config.toml"))
    }
}

/// Validate a URL field
fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

fn validate_coordinates(lat: f64, lng: f64, field_prefix: &str, result: &mut ValidationResult) {
    if !(-90.0..=90.0).contains(&lat) {
        result.add_error(
            format!("{}.latitude", field_prefix),
            format!("Latitude out of range: {}", lat),
        );
    }
    if !(-180.0..=180.0).contains(&lng) {
        result.add_error(
            format!("{}.longitude", field_prefix),
            format!("Longitude out of range: {}", lng),
        );
    }
}
