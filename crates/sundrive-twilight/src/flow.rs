//! The twilight refresh flow.
//!
//! One inbound message drives one pass:
//! timezone -> location -> cache check -> (fetch -> cache put) -> deliver.
//! Nothing is retried. A location failure is replaced by the fallback
//! position; a fetch failure ends the cycle without sending anything.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use sundrive_core::Config;
use tokio::time::Instant;

use crate::cache::TwilightCache;
use crate::channel::{DeviceChannel, InboundMessage, OutboundMessage};
use crate::encoder::EncodedTwilight;
use crate::error::{LocationError, TwilightError};
use crate::location::LocationProvider;
use crate::lunar::{lunar_age, LunarPhase};
use crate::provider::TwilightSource;
use crate::timezone::{normalize_timezone, DEFAULT_TIMEZONE};
use crate::types::{Coordinates, DataOrigin, TwilightDataset};

/// Zaragoza, Spain
pub const FALLBACK_COORDINATES: Coordinates = Coordinates {
    latitude: 41.65606,
    longitude: -0.87734,
};

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Upper bound on one location query
    pub location_timeout: Duration,
    /// A remembered position younger than this skips the provider
    pub maximum_age: Duration,
    /// Used whenever the provider fails or times out
    pub fallback: Coordinates,
    /// Deliver the example dataset instead of refreshing
    pub test_mode: bool,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            location_timeout: Duration::from_secs(15),
            maximum_age: Duration::from_secs(60),
            fallback: FALLBACK_COORDINATES,
            test_mode: false,
        }
    }
}

impl RefreshOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            location_timeout: Duration::from_secs(config.location.timeout_secs),
            maximum_age: Duration::from_secs(config.location.maximum_age_secs),
            fallback: Coordinates::new(
                config.location.fallback_latitude,
                config.location.fallback_longitude,
            ),
            test_mode: config.twilight.test_mode,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ResolvedPosition {
    coordinates: Coordinates,
    resolved_at: Instant,
}

/// Process-lifetime state shared by every refresh: the cache store and the
/// last position the provider returned. Starts empty.
#[derive(Debug)]
pub struct RefreshContext {
    cache: TwilightCache,
    last_position: Mutex<Option<ResolvedPosition>>,
}

impl RefreshContext {
    pub fn new(cache: TwilightCache) -> Self {
        Self {
            cache,
            last_position: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &TwilightCache {
        &self.cache
    }

    /// Last position the provider returned, if any.
    pub fn last_position(&self) -> Option<Coordinates> {
        (*self.last_position.lock()).map(|p| p.coordinates)
    }

    fn recent_position(&self, maximum_age: Duration) -> Option<Coordinates> {
        let last = *self.last_position.lock();
        last.filter(|p| p.resolved_at.elapsed() <= maximum_age)
            .map(|p| p.coordinates)
    }

    fn remember_position(&self, coordinates: Coordinates) {
        *self.last_position.lock() = Some(ResolvedPosition {
            coordinates,
            resolved_at: Instant::now(),
        });
    }
}

/// How a refresh cycle ended
#[derive(Debug)]
pub enum RefreshOutcome {
    /// Encoded data handed to the device channel
    Delivered(DataOrigin),
    /// The channel refused the message; nothing is retried
    DeliveryFailed(DataOrigin),
    /// The data source failed; nothing was sent this cycle
    FetchFailed(TwilightError),
    /// The message didn't ask for a refresh
    Ignored,
}

impl RefreshOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

pub struct RefreshFlow<L, S, D> {
    context: Arc<RefreshContext>,
    location: L,
    source: S,
    channel: D,
    options: RefreshOptions,
}

impl<L, S, D> RefreshFlow<L, S, D>
where
    L: LocationProvider,
    S: TwilightSource,
    D: DeviceChannel,
{
    pub fn new(
        context: Arc<RefreshContext>,
        location: L,
        source: S,
        channel: D,
        options: RefreshOptions,
    ) -> Self {
        Self {
            context,
            location,
            source,
            channel,
            options,
        }
    }

    pub fn context(&self) -> &RefreshContext {
        &self.context
    }

    pub fn channel(&self) -> &D {
        &self.channel
    }

    /// React to one message from the watch.
    pub async fn handle_message(&self, message: InboundMessage) -> RefreshOutcome {
        match message {
            InboundMessage::Ready => self.announce_ready().await,
            InboundMessage::AppMessage { payload } => match payload.timezone() {
                Some(tz) => {
                    tracing::info!("Received timezone from watch: {}", tz);
                    let tzid = normalize_timezone(tz);
                    self.refresh(Some(&tzid)).await
                }
                None => {
                    tracing::info!("Received message without timezone, ignoring");
                    RefreshOutcome::Ignored
                }
            },
        }
    }

    /// Ready handshake: example data first, then the `js_ready` flag.
    pub async fn announce_ready(&self) -> RefreshOutcome {
        tracing::info!("Watch ready, sending example data");
        let outcome = self
            .deliver(&TwilightDataset::example(), DataOrigin::Example)
            .await;

        match self.channel.send(&OutboundMessage::ready()).await {
            Ok(()) => tracing::info!("Ready message sent"),
            Err(e) => tracing::warn!("Error sending ready message: {}", e),
        }

        outcome
    }

    /// One refresh cycle for `tzid` (`UTC` when absent).
    pub async fn refresh(&self, tzid: Option<&str>) -> RefreshOutcome {
        if self.options.test_mode {
            tracing::info!("Test mode - using example data");
            return self
                .deliver(&TwilightDataset::example(), DataOrigin::Example)
                .await;
        }

        let now = chrono::Local::now();
        let age = lunar_age(&now);
        tracing::debug!(
            "Lunar phase: {} (age {:.2} days)",
            LunarPhase::from_age(age).abbreviation(),
            age
        );

        let tzid = match tzid {
            Some(tz) if !tz.is_empty() => tz,
            _ => {
                tracing::info!("No timezone provided, defaulting to {}", DEFAULT_TIMEZONE);
                DEFAULT_TIMEZONE
            }
        };
        tracing::info!("Using timezone: {}", tzid);

        let coordinates = self.resolve_location().await;

        let cache = self.context.cache();
        let cached = cache.get();
        if cache.is_valid(cached.as_ref(), coordinates, tzid) {
            if let Some(entry) = cached {
                tracing::info!("Using cached twilight data");
                return self.deliver(&entry.data, DataOrigin::Cache).await;
            }
        }

        tracing::info!("Cache invalid or expired, fetching from API");
        match self.source.fetch(coordinates, tzid).await {
            Ok(dataset) => {
                if let Err(e) = cache.put(coordinates, tzid, &dataset) {
                    tracing::warn!("Error saving cache: {}", e);
                }
                self.deliver(&dataset, DataOrigin::Network).await
            }
            Err(e) => {
                tracing::error!("Twilight fetch failed, skipping this refresh: {}", e);
                RefreshOutcome::FetchFailed(e)
            }
        }
    }

    async fn resolve_location(&self) -> Coordinates {
        if let Some(recent) = self.context.recent_position(self.options.maximum_age) {
            tracing::debug!("Reusing recent position {}", recent);
            return recent;
        }

        let result = tokio::time::timeout(
            self.options.location_timeout,
            self.location.current_location(),
        )
        .await
        .unwrap_or(Err(LocationError::Timeout));

        match result {
            Ok(coordinates) => {
                tracing::info!("Got location: {}", coordinates);
                self.context.remember_position(coordinates);
                coordinates
            }
            Err(e) => {
                tracing::warn!(
                    "Location error: {}, using fallback {}",
                    e,
                    self.options.fallback
                );
                self.options.fallback
            }
        }
    }

    async fn deliver(&self, dataset: &TwilightDataset, origin: DataOrigin) -> RefreshOutcome {
        let encoded = EncodedTwilight::from_dataset(dataset);
        tracing::debug!("Sending twilight data ({}): {:?}", origin.as_str(), encoded);

        match self.channel.send(&OutboundMessage::Twilight(encoded)).await {
            Ok(()) => {
                tracing::info!("Twilight data sent successfully");
                RefreshOutcome::Delivered(origin)
            }
            Err(e) => {
                tracing::warn!("Error sending twilight data: {}", e);
                RefreshOutcome::DeliveryFailed(origin)
            }
        }
    }
}
