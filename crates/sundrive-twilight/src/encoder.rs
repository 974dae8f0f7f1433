//! Converts 12-hour wall-clock strings into minutes since local midnight.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::TwilightDataset;

static TIME_OF_DAY: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"([0-9]+):([0-9]+):([0-9]+)\s+(AM|PM)").ok());

/// Minutes since midnight for a string like `"7:28:31 AM"`.
///
/// Seconds are dropped. Anything that doesn't parse as a 12-hour time
/// (hour 1-12, minute and second 0-59) yields 0 so a single bad field
/// never blocks the rest of the dataset.
pub fn encode_time(time: &str) -> u16 {
    match parse_time(time) {
        Some(minutes) => minutes,
        None => {
            tracing::warn!("Unparseable time of day {:?}, encoding as 0", time);
            0
        }
    }
}

fn parse_time(time: &str) -> Option<u16> {
    let caps = TIME_OF_DAY.as_ref()?.captures(time)?;

    let hours: u16 = caps[1].parse().ok()?;
    let minutes: u16 = caps[2].parse().ok()?;
    let seconds: u16 = caps[3].parse().ok()?;
    let is_pm = &caps[4] == "PM";

    if !(1..=12).contains(&hours) || minutes > 59 || seconds > 59 {
        return None;
    }

    let hours = match (is_pm, hours) {
        (false, 12) => 0,
        (true, 12) => 12,
        (true, h) => h + 12,
        (false, h) => h,
    };

    Some(hours * 60 + minutes)
}

/// Dataset in the compact form the watchface expects: each field in minutes
/// since local midnight, range 0..=1439.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedTwilight {
    pub sunrise: u16,
    pub sunset: u16,
    pub civil_twilight_begin: u16,
    pub civil_twilight_end: u16,
    pub nautical_twilight_begin: u16,
    pub nautical_twilight_end: u16,
    pub astronomical_twilight_begin: u16,
    pub astronomical_twilight_end: u16,
}

impl EncodedTwilight {
    pub fn from_dataset(dataset: &TwilightDataset) -> Self {
        Self {
            sunrise: encode_time(&dataset.sunrise),
            sunset: encode_time(&dataset.sunset),
            civil_twilight_begin: encode_time(&dataset.civil_twilight_begin),
            civil_twilight_end: encode_time(&dataset.civil_twilight_end),
            nautical_twilight_begin: encode_time(&dataset.nautical_twilight_begin),
            nautical_twilight_end: encode_time(&dataset.nautical_twilight_end),
            astronomical_twilight_begin: encode_time(&dataset.astronomical_twilight_begin),
            astronomical_twilight_end: encode_time(&dataset.astronomical_twilight_end),
        }
    }
}

impl From<&TwilightDataset> for EncodedTwilight {
    fn from(dataset: &TwilightDataset) -> Self {
        Self::from_dataset(dataset)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_midnight_and_noon() {
        assert_eq!(encode_time("12:00:00 AM"), 0);
        assert_eq!(encode_time("12:00:00 PM"), 720);
        assert_eq!(encode_time("12:59:59 AM"), 59);
        assert_eq!(encode_time("12:30:00 PM"), 750);
    }

    #[test]
    fn test_regular_hours() {
        assert_eq!(encode_time("1:05:00 PM"), 785);
        assert_eq!(encode_time("7:28:31 AM"), 448);
        assert_eq!(encode_time("4:51:53 PM"), 1011);
        assert_eq!(encode_time("11:59:59 PM"), 1439);
    }

    #[test]
    fn test_malformed_is_zero() {
        assert_eq!(encode_time(""), 0);
        assert_eq!(encode_time("7:28 AM"), 0);
        assert_eq!(encode_time("19:28:31"), 0);
        assert_eq!(encode_time("7:28:31 am"), 0);
        assert_eq!(encode_time("13:00:00 PM"), 0);
        assert_eq!(encode_time("0:15:00 AM"), 0);
        assert_eq!(encode_time("7:75:00 AM"), 0);
        assert_eq!(encode_time("\u{667}:28:31 AM"), 0);
    }

    #[test]
    fn test_encode_example_dataset() {
        let encoded = EncodedTwilight::from_dataset(&TwilightDataset::example());
        assert_eq!(encoded.sunrise, 371);
        assert_eq!(encoded.sunset, 1092);
        assert_eq!(encoded.civil_twilight_begin, 345);
        assert_eq!(encoded.civil_twilight_end, 1118);
        assert_eq!(encoded.nautical_twilight_begin, 313);
        assert_eq!(encoded.nautical_twilight_end, 1151);
        assert_eq!(encoded.astronomical_twilight_begin, 280);
        assert_eq!(encoded.astronomical_twilight_end, 1183);
    }

    #[test]
    fn test_bad_field_does_not_block_others() {
        let mut dataset = TwilightDataset::example();
        dataset.sunset = "garbage".to_string();
        let encoded = EncodedTwilight::from(&dataset);
        assert_eq!(encoded.sunset, 0);
        assert_eq!(encoded.sunrise, 371);
    }

    #[test]
    fn test_serialized_keys() {
        let encoded = EncodedTwilight::from_dataset(&TwilightDataset::example());
        let value = serde_json::to_value(encoded).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 8);
        assert_eq!(obj["astronomical_twilight_end"], 1183);
    }

    proptest! {
        #[test]
        fn prop_valid_times_in_range(h in 1u16..=12, m in 0u16..=59, s in 0u16..=59, pm in any::<bool>()) {
            let text = format!("{}:{:02}:{:02} {}", h, m, s, if pm { "PM" } else { "AM" });
            let minutes = encode_time(&text);
            prop_assert!(minutes <= 1439);
            prop_assert_eq!(minutes % 60, m);
            prop_assert_eq!(minutes >= 720, pm);
        }
    }
}
