//! Single-slot persistent cache for the last fetched twilight dataset.
//!
//! The slot is a JSON file holding `{date, latitude, longitude, tzid, data}`.
//! Every successful fetch overwrites it; nothing ever deletes it. Freshness is
//! decided at read time by [`CacheEntry::is_valid_for`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::error::CacheError;
use crate::types::{Coordinates, TwilightDataset};

/// Maximum movement, in hundredths of a degree per axis, before the cached
/// location no longer counts as "here" (0.1 degrees, ~11 km).
const LOCATION_TOLERANCE_HUNDREDTHS: i64 = 10;

/// The one cached dataset and the key it was fetched for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Local calendar day the data was fetched on
    pub date: NaiveDate,
    /// Rounded to 2 decimals
    pub latitude: f64,
    /// Rounded to 2 decimals
    pub longitude: f64,
    pub tzid: String,
    /// Raw time-of-day strings; encoded again on every delivery
    pub data: TwilightDataset,
}

/// Why a cache entry can't be reused
#[derive(Debug, Clone, PartialEq)]
pub enum Staleness {
    DateChanged { cached: NaiveDate, today: NaiveDate },
    TimezoneChanged { cached: String, requested: String },
    LocationMoved { lat_diff: f64, lng_diff: f64 },
}

impl std::fmt::Display for Staleness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DateChanged { cached, today } => {
                write!(f, "date changed ({} -> {})", cached, today)
            }
            Self::TimezoneChanged { cached, requested } => {
                write!(f, "timezone changed ({} -> {})", cached, requested)
            }
            Self::LocationMoved { lat_diff, lng_diff } => write!(
                f,
                "location moved (lat diff: {:.2}, lng diff: {:.2})",
                lat_diff, lng_diff
            ),
        }
    }
}

impl CacheEntry {
    pub fn new(
        date: NaiveDate,
        coordinates: Coordinates,
        tzid: impl Into<String>,
        data: TwilightDataset,
    ) -> Self {
        let rounded = coordinates.rounded();
        Self {
            date,
            latitude: rounded.latitude,
            longitude: rounded.longitude,
            tzid: tzid.into(),
            data,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// First reason this entry can't serve a request, if any.
    ///
    /// Date, then timezone, then location. Any single mismatch invalidates
    /// the whole entry.
    pub fn staleness(
        &self,
        today: NaiveDate,
        coordinates: Coordinates,
        tzid: &str,
    ) -> Option<Staleness> {
        if self.date != today {
            return Some(Staleness::DateChanged {
                cached: self.date,
                today,
            });
        }

        if self.tzid != tzid {
            return Some(Staleness::TimezoneChanged {
                cached: self.tzid.clone(),
                requested: tzid.to_string(),
            });
        }

        let (cached_lat, cached_lng) = self.coordinates().hundredths();
        let (lat, lng) = coordinates.hundredths();
        let lat_diff = lat.saturating_sub(cached_lat).saturating_abs();
        let lng_diff = lng.saturating_sub(cached_lng).saturating_abs();

        if lat_diff >= LOCATION_TOLERANCE_HUNDREDTHS || lng_diff >= LOCATION_TOLERANCE_HUNDREDTHS {
            return Some(Staleness::LocationMoved {
                lat_diff: lat_diff as f64 / 100.0,
                lng_diff: lng_diff as f64 / 100.0,
            });
        }

        None
    }

    /// Pure validity check against an explicit `today`.
    pub fn is_valid_for(&self, today: NaiveDate, coordinates: Coordinates, tzid: &str) -> bool {
        self.staleness(today, coordinates, tzid).is_none()
    }
}

/// File-backed single-slot twilight cache
pub struct TwilightCache {
    cache_path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TwilightCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilightCache")
            .field("cache_path", &self.cache_path)
            .finish_non_exhaustive()
    }
}

impl TwilightCache {
    /// Cache stored at `cache_path`, dated by the local wall clock.
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self::with_clock(cache_path, Arc::new(SystemClock))
    }

    pub fn with_clock(cache_path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache_path: cache_path.into(),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.cache_path
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Overwrite the slot with `data`, stamped with today's date.
    pub fn put(
        &self,
        coordinates: Coordinates,
        tzid: &str,
        data: &TwilightDataset,
    ) -> Result<CacheEntry, CacheError> {
        let entry = CacheEntry::new(self.today(), coordinates, tzid, data.clone());

        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(&entry)?;
        std::fs::write(&self.cache_path, &json)?;

        tracing::info!("Cache saved: {}", json);
        Ok(entry)
    }

    /// Current slot contents. Missing or unreadable data reads as `None`.
    pub fn get(&self) -> Option<CacheEntry> {
        let contents = match std::fs::read_to_string(&self.cache_path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No cache at {}", self.cache_path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("Error loading cache: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&contents) {
            Ok(entry) if !entry.coordinates().is_in_range() => {
                tracing::warn!(
                    "Cached coordinates out of range ({}), ignoring cache",
                    entry.coordinates()
                );
                None
            }
            Ok(entry) => {
                tracing::debug!("Cache loaded: {}", contents);
                Some(entry)
            }
            Err(e) => {
                tracing::warn!("Error parsing cache, ignoring it: {}", e);
                None
            }
        }
    }

    /// Whether `entry` can serve a request for `coordinates` in `tzid` today.
    pub fn is_valid(&self, entry: Option<&CacheEntry>, coordinates: Coordinates, tzid: &str) -> bool {
        let Some(entry) = entry else {
            tracing::info!("Cache validation: no cache data");
            return false;
        };

        match entry.staleness(self.today(), coordinates, tzid) {
            Some(reason) => {
                tracing::info!("Cache validation: {}", reason);
                false
            }
            None => {
                tracing::info!("Cache validation: cache is valid");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    struct FixedClock(NaiveDate);

    impl Clock for FixedClock {
        fn today(&self) -> NaiveDate {
            self.0
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn entry() -> CacheEntry {
        CacheEntry::new(
            day(18),
            Coordinates::new(41.65, -0.88),
            "Etc/GMT+1",
            TwilightDataset::example(),
        )
    }

    fn cache_in(dir: &Path, today: NaiveDate) -> TwilightCache {
        TwilightCache::with_clock(dir.join("twilight_cache.json"), Arc::new(FixedClock(today)))
    }

    #[test]
    fn test_entry_valid_when_all_axes_match() {
        let here = Coordinates::new(41.65, -0.88);
        assert!(entry().is_valid_for(day(18), here, "Etc/GMT+1"));
    }

    #[test]
    fn test_date_change_invalidates() {
        let here = Coordinates::new(41.65, -0.88);
        let e = entry();
        assert!(!e.is_valid_for(day(19), here, "Etc/GMT+1"));
        assert!(matches!(
            e.staleness(day(17), here, "Etc/GMT+1"),
            Some(Staleness::DateChanged { .. })
        ));
    }

    #[test]
    fn test_timezone_change_invalidates() {
        let here = Coordinates::new(41.65, -0.88);
        assert!(!entry().is_valid_for(day(18), here, "Europe/Madrid"));
    }

    #[test]
    fn test_latitude_move_invalidates() {
        assert!(!entry().is_valid_for(day(18), Coordinates::new(41.75, -0.88), "Etc/GMT+1"));
        assert!(!entry().is_valid_for(day(18), Coordinates::new(41.55, -0.88), "Etc/GMT+1"));
    }

    #[test]
    fn test_longitude_move_invalidates() {
        assert!(!entry().is_valid_for(day(18), Coordinates::new(41.65, -0.78), "Etc/GMT+1"));
        assert!(!entry().is_valid_for(day(18), Coordinates::new(41.65, -0.98), "Etc/GMT+1"));
    }

    #[test]
    fn test_small_jitter_tolerated() {
        let e = entry();
        assert!(e.is_valid_for(day(18), Coordinates::new(41.7449, -0.88), "Etc/GMT+1"));
        assert!(e.is_valid_for(day(18), Coordinates::new(41.65606, -0.87734), "Etc/GMT+1"));
        assert!(e.is_valid_for(day(18), Coordinates::new(41.56, -0.7951), "Etc/GMT+1"));
    }

    #[test]
    fn test_entry_rounds_coordinates() {
        let e = CacheEntry::new(
            day(18),
            Coordinates::new(41.65606, -0.87734),
            "UTC",
            TwilightDataset::example(),
        );
        assert_eq!(e.latitude, 41.66);
        assert_eq!(e.longitude, -0.88);
    }

    #[test]
    fn test_put_then_get_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path(), day(18));
        let here = Coordinates::new(41.65606, -0.87734);

        cache.put(here, "Etc/GMT+1", &TwilightDataset::example()).unwrap();
        let loaded = cache.get().unwrap();

        assert_eq!(loaded.date, day(18));
        assert_eq!(loaded.data, TwilightDataset::example());
        assert!(cache.is_valid(Some(&loaded), here, "Etc/GMT+1"));
    }

    #[test]
    fn test_put_overwrites_slot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path(), day(18));

        cache
            .put(Coordinates::new(41.65, -0.88), "UTC", &TwilightDataset::example())
            .unwrap();
        let mut other = TwilightDataset::example();
        other.sunrise = "7:00:00 AM".to_string();
        cache
            .put(Coordinates::new(40.42, -3.70), "Europe/Madrid", &other)
            .unwrap();

        let loaded = cache.get().unwrap();
        assert_eq!(loaded.tzid, "Europe/Madrid");
        assert_eq!(loaded.data.sunrise, "7:00:00 AM");
    }

    #[test]
    fn test_persisted_layout() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path(), day(18));
        cache
            .put(Coordinates::new(41.65606, -0.87734), "UTC", &TwilightDataset::example())
            .unwrap();

        let raw = std::fs::read_to_string(cache.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["date"], "2026-10-18");
        assert_eq!(value["latitude"], 41.66);
        assert_eq!(value["longitude"], -0.88);
        assert_eq!(value["tzid"], "UTC");
        assert_eq!(value["data"]["sunrise"], "6:11:35 AM");
    }

    #[test]
    fn test_missing_cache_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path(), day(18));
        assert!(cache.get().is_none());
        assert!(!cache.is_valid(None, Coordinates::new(41.65, -0.88), "UTC"));
    }

    #[test]
    fn test_corrupt_cache_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path(), day(18));
        std::fs::write(cache.path(), "{not json").unwrap();
        assert!(cache.get().is_none());

        std::fs::write(cache.path(), r#"{"date":"2026-10-18","latitude":1.0}"#).unwrap();
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_out_of_range_cache_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path(), day(18));
        let mut stored = serde_json::to_value(entry()).unwrap();
        stored["tzid"] = "UTC".into();
        stored["latitude"] = serde_json::json!(-1e300);
        std::fs::write(cache.path(), stored.to_string()).unwrap();

        let loaded = cache.get();
        assert!(loaded.is_none());
        assert!(!cache.is_valid(loaded.as_ref(), Coordinates::new(41.65, -0.88), "UTC"));
    }

    #[test]
    fn test_far_away_entry_is_stale_not_overflowing() {
        let far = CacheEntry {
            latitude: -1e300,
            ..entry()
        };
        let staleness = far.staleness(day(18), Coordinates::new(41.65, -0.88), "Etc/GMT+1");
        assert!(matches!(staleness, Some(Staleness::LocationMoved { .. })));
    }

    #[test]
    fn test_put_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        let cache = TwilightCache::with_clock(
            blocker.join("twilight_cache.json"),
            Arc::new(FixedClock(day(18))),
        );

        let result = cache.put(Coordinates::new(41.65, -0.88), "UTC", &TwilightDataset::example());
        assert!(matches!(result, Err(CacheError::Io(_))));
    }
}
