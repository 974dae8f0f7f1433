use serde::{Deserialize, Serialize};

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both axes rounded to 2 decimal places (~1.1 km).
    pub fn rounded(&self) -> Self {
        Self {
            latitude: round_coordinate(self.latitude),
            longitude: round_coordinate(self.longitude),
        }
    }

    /// Finite and within ±90 latitude, ±180 longitude.
    pub fn is_in_range(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Rounded axes as whole hundredths of a degree, for exact comparison.
    pub(crate) fn hundredths(&self) -> (i64, i64) {
        (to_hundredths(self.latitude), to_hundredths(self.longitude))
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Round a coordinate to 2 decimal places.
pub fn round_coordinate(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn to_hundredths(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Twilight times for one day at one place, as returned by the data source.
///
/// Every field is a 12-hour wall-clock string such as `"6:11:35 AM"`.
/// `solar_noon` and `day_length` are carried along when the source sends
/// them but are never delivered to the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwilightDataset {
    pub sunrise: String,
    pub sunset: String,
    pub civil_twilight_begin: String,
    pub civil_twilight_end: String,
    pub nautical_twilight_begin: String,
    pub nautical_twilight_end: String,
    pub astronomical_twilight_begin: String,
    pub astronomical_twilight_end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solar_noon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_length: Option<String>,
}

impl TwilightDataset {
    /// Placeholder dataset sent on the ready handshake and in test mode.
    pub fn example() -> Self {
        Self {
            sunrise: "6:11:35 AM".to_string(),
            sunset: "6:12:31 PM".to_string(),
            civil_twilight_begin: "5:45:21 AM".to_string(),
            civil_twilight_end: "6:38:45 PM".to_string(),
            nautical_twilight_begin: "5:13:02 AM".to_string(),
            nautical_twilight_end: "7:11:04 PM".to_string(),
            astronomical_twilight_begin: "4:40:13 AM".to_string(),
            astronomical_twilight_end: "7:43:53 PM".to_string(),
            solar_noon: Some("12:12:03 PM".to_string()),
            day_length: Some("12:00:56".to_string()),
        }
    }
}

/// Where the delivered dataset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    Cache,
    Network,
    Example,
}

impl DataOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Network => "network",
            Self::Example => "example",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_round_coordinate() {
        assert_eq!(round_coordinate(41.65606), 41.66);
        assert_eq!(round_coordinate(-0.87734), -0.88);
        assert_eq!(round_coordinate(0.0), 0.0);
    }

    #[test]
    fn test_coordinate_range() {
        assert!(Coordinates::new(41.65, -0.88).is_in_range());
        assert!(Coordinates::new(-90.0, 180.0).is_in_range());
        assert!(!Coordinates::new(-1e300, -0.88).is_in_range());
        assert!(!Coordinates::new(41.65, 180.5).is_in_range());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_in_range());
    }

    #[test]
    fn test_rounded_coordinates() {
        let c = Coordinates::new(41.65606, -0.87734).rounded();
        assert_eq!(c, Coordinates::new(41.66, -0.88));
        assert_eq!(c.hundredths(), (4166, -88));
    }

    #[test]
    fn test_dataset_ignores_unknown_fields() {
        let json = serde_json::json!({
            "sunrise": "7:28:31 AM",
            "sunset": "4:51:53 PM",
            "solar_noon": "12:10:12 PM",
            "day_length": "09:23:22",
            "civil_twilight_begin": "6:58:40 AM",
            "civil_twilight_end": "5:21:44 PM",
            "nautical_twilight_begin": "6:25:12 AM",
            "nautical_twilight_end": "5:55:12 PM",
            "astronomical_twilight_begin": "5:53:02 AM",
            "astronomical_twilight_end": "6:27:22 PM",
            "moon": "ignored"
        });
        let dataset: TwilightDataset = serde_json::from_value(json).unwrap();
        assert_eq!(dataset.sunrise, "7:28:31 AM");
        assert_eq!(dataset.day_length.as_deref(), Some("09:23:22"));
    }

    #[test]
    fn test_dataset_requires_all_twilight_fields() {
        let json = serde_json::json!({ "sunrise": "7:28:31 AM", "sunset": "4:51:53 PM" });
        assert!(serde_json::from_value::<TwilightDataset>(json).is_err());
    }
}
