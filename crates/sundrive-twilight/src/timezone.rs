use once_cell::sync::Lazy;
use regex::Regex;

/// Timezone used when the device didn't name one.
pub const DEFAULT_TIMEZONE: &str = "UTC";

static UTC_OFFSET: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^UTC[+-][0-9]+$").ok());

/// Rewrite the watch's `UTC±N` shorthand to the `Etc/GMT±N` identifier the
/// data source understands. Sign and digits are kept as-is; anything else
/// passes through untouched.
pub fn normalize_timezone(tzid: &str) -> String {
    let is_offset = UTC_OFFSET
        .as_ref()
        .map(|re| re.is_match(tzid))
        .unwrap_or(false);

    match tzid.strip_prefix("UTC") {
        Some(offset) if is_offset => {
            let normalized = format!("Etc/GMT{}", offset);
            tracing::info!("Normalized timezone {} to {}", tzid, normalized);
            normalized
        }
        _ => tzid.to_string(),
    }
}
