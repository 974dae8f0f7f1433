//! Twilight refresh for the Sundrive watchface.
//!
//! Resolves an approximate location, fetches today's sunrise/sunset and
//! twilight times from sunrise-sunset.org (or a same-day cache), encodes them
//! as minutes since midnight and hands them to the watch.

pub mod cache;
pub mod channel;
pub mod clock;
pub mod encoder;
pub mod error;
pub mod flow;
pub mod location;
pub mod lunar;
pub mod provider;
pub mod timezone;
pub mod types;

pub use cache::{CacheEntry, Staleness, TwilightCache};
pub use channel::{AppMessagePayload, DeviceChannel, InboundMessage, JsonLinesChannel, OutboundMessage};
pub use clock::{Clock, SystemClock};
pub use encoder::{encode_time, EncodedTwilight};
pub use error::{CacheError, ChannelError, LocationError, TwilightError};
pub use flow::{RefreshContext, RefreshFlow, RefreshOptions, RefreshOutcome, FALLBACK_COORDINATES};
pub use location::{ConfiguredLocation, FixedLocation, IpLocationProvider, LocationProvider, NoLocation};
pub use lunar::LunarPhase;
pub use provider::{SunriseSunsetClient, TwilightSource};
pub use timezone::normalize_timezone;
pub use types::{Coordinates, DataOrigin, TwilightDataset};
