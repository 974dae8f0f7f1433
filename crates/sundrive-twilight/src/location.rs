//! Location providers. All of them are best-effort: the refresh flow
//! replaces any failure with its fallback coordinates.

use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::instrument;

use sundrive_core::{LocationConfig, LocationProviderKind};

use crate::error::LocationError;
use crate::types::Coordinates;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "Sundrive/0.1.0";

/// Supplies the device's approximate position.
pub trait LocationProvider: Send + Sync {
    fn current_location(&self) -> impl Future<Output = Result<Coordinates, LocationError>> + Send;
}

/// A position fixed in configuration
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

/// No positioning available on this host
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    async fn current_location(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::ServiceUnavailable)
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    message: Option<String>,
}

/// Approximate position from the public IP address (ip-api.com format)
#[derive(Debug, Clone)]
pub struct IpLocationProvider {
    client: Client,
    url: String,
}

impl IpLocationProvider {
    pub fn new(url: &str) -> Result<Self, LocationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl LocationProvider for IpLocationProvider {
    #[instrument(skip(self), fields(url = %self.url), level = "debug")]
    async fn current_location(&self) -> Result<Coordinates, LocationError> {
        let response = self.client.get(&self.url).send().await?;

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(LocationError::PermissionDenied);
        }
        if !response.status().is_success() {
            return Err(LocationError::Other(format!(
                "IP lookup returned status {}",
                response.status()
            )));
        }

        let body: IpApiResponse = response.json().await?;

        if body.status != "success" {
            return Err(LocationError::Other(
                body.message.unwrap_or_else(|| body.status.clone()),
            ));
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => {
                tracing::debug!("IP lookup placed us at {}, {}", lat, lon);
                Ok(Coordinates::new(lat, lon))
            }
            _ => Err(LocationError::Other("IP lookup returned no coordinates".to_string())),
        }
    }
}

/// Provider selected by `[location]` configuration
#[derive(Debug, Clone)]
pub enum ConfiguredLocation {
    Fixed(FixedLocation),
    Ip(IpLocationProvider),
    None(NoLocation),
}

impl ConfiguredLocation {
    pub fn from_config(config: &LocationConfig) -> Result<Self, LocationError> {
        match config.provider {
            LocationProviderKind::Fixed => match (config.latitude, config.longitude) {
                (Some(lat), Some(lng)) => Ok(Self::Fixed(FixedLocation(Coordinates::new(lat, lng)))),
                _ => Err(LocationError::Other(
                    "fixed location needs latitude and longitude".to_string(),
                )),
            },
            LocationProviderKind::Ip => Ok(Self::Ip(IpLocationProvider::new(&config.ip_api_url)?)),
            LocationProviderKind::None => Ok(Self::None(NoLocation)),
        }
    }
}

impl LocationProvider for ConfiguredLocation {
    async fn current_location(&self) -> Result<Coordinates, LocationError> {
        match self {
            Self::Fixed(p) => p.current_location().await,
            Self::Ip(p) => p.current_location().await,
            Self::None(p) => p.current_location().await,
        }
    }
}
