//! Twilight data source: the sunrise-sunset.org JSON API.

use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::error::TwilightError;
use crate::types::{Coordinates, TwilightDataset};

pub const SUNRISE_SUNSET_URL: &str = "https://api.sunrise-sunset.org/json";

/// Anything that can produce today's twilight times for a place.
pub trait TwilightSource: Send + Sync {
    fn fetch(
        &self,
        coordinates: Coordinates,
        tzid: &str,
    ) -> impl Future<Output = Result<TwilightDataset, TwilightError>> + Send;
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    results: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct SunriseSunsetClient {
    client: Arc<Client>,
    base_url: String,
}

impl SunriseSunsetClient {
    /// Client for the public API. `timeout` of `None` keeps reqwest's default.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TwilightError> {
        Self::with_base_url(SUNRISE_SUNSET_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Option<Duration>) -> Result<Self, TwilightError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request_url(&self, coordinates: Coordinates, tzid: &str) -> String {
        format!(
            "{}?lat={}&lng={}&formatted=1&tzid={}",
            self.base_url,
            coordinates.latitude,
            coordinates.longitude,
            urlencoding::encode(tzid),
        )
    }
}

impl TwilightSource for SunriseSunsetClient {
    #[instrument(skip(self), level = "info")]
    async fn fetch(
        &self,
        coordinates: Coordinates,
        tzid: &str,
    ) -> Result<TwilightDataset, TwilightError> {
        let url = self.request_url(coordinates, tzid);
        tracing::info!("Fetching twilight data for {} in {}", coordinates, tzid);

        let response = self.client.get(&url).send().await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(TwilightError::HttpStatus(response.status().as_u16()));
        }

        let body = response.text().await?;
        let parsed: ApiResponse =
            serde_json::from_str(&body).map_err(|e| TwilightError::Parse(e.to_string()))?;

        if parsed.status != "OK" {
            return Err(TwilightError::ApiStatus(parsed.status));
        }

        let results = parsed
            .results
            .ok_or_else(|| TwilightError::Parse("response has no results".to_string()))?;

        serde_json::from_value(results).map_err(|e| TwilightError::Parse(e.to_string()))
    }
}
