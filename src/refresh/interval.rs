//! Refresh interval resolution.

use std::time::Duration;

use crate::observability::metrics;
use crate::store::GatewayStore;

/// Longest period the scheduler accepts.
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Interpret a stored interval value.
///
/// Surrounding whitespace is ignored and the leading run of digits is the
/// number of seconds, so `"30s"` reads as 30 and `"1.5"` as 1. Zero or a
/// value with no leading digits yields `default`. Values above
/// `MAX_INTERVAL` are clamped to it.
pub fn parse_interval(raw: Option<&str>, default: Duration) -> Duration {
    let Some(raw) = raw else {
        return default;
    };

    let trimmed = raw.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let digits = &unsigned[..digits_end];

    // A run of digits only fails to parse by overflowing
    let secs = match digits {
        "" => 0,
        digits => digits.parse::<u64>().unwrap_or(u64::MAX),
    };

    if secs == 0 {
        tracing::warn!(
            value = %raw,
            default_secs = default.as_secs(),
            "Unusable refresh interval, using default"
        );
        return default;
    }

    let interval = Duration::from_secs(secs);
    if interval > MAX_INTERVAL {
        tracing::warn!(
            value = %raw,
            max_secs = MAX_INTERVAL.as_secs(),
            "Refresh interval too long, clamping"
        );
        return MAX_INTERVAL;
    }
    interval
}

/// Read the interval stored under `key`, falling back to `default`.
pub async fn resolve_interval(store: &dyn GatewayStore, key: &str, default: Duration) -> Duration {
    match store.read_config_value(key).await {
        Ok(value) => parse_interval(value.as_deref(), default),
        Err(e) => {
            metrics::record_store_error("read_config_value");
            tracing::error!(key = %key, error = %e, "Failed to load refresh interval");
            default
        }
    }
}
