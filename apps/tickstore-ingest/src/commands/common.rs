use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::path::Path;
use tickstore_application::config::{load_config, Config};

/// Epoch values above this are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

pub(super) fn require_config(path: Option<&Path>) -> Result<Config, String> {
    let path = path.ok_or("missing --config (or env TICKSTORE_CONFIG)")?;
    load_config(path)
}

/// Accepts epoch seconds, epoch milliseconds or RFC3339.
pub(super) fn parse_time_input(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(ts) = value.parse::<i64>() {
        let parsed = if ts.abs() >= EPOCH_MILLIS_THRESHOLD {
            Utc.timestamp_millis_opt(ts).single()
        } else {
            Utc.timestamp_opt(ts, 0).single()
        };
        return parsed.ok_or_else(|| format!("epoch out of range: {value}"));
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| format!("unsupported timestamp format: {value}"))
}

pub(super) fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| format!("failed to render JSON: {err}"))?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_time_input, require_config};

    #[test]
    fn parse_epoch_seconds_and_millis() {
        assert_eq!(
            parse_time_input("1700000000").unwrap().timestamp(),
            1_700_000_000
        );
        let millis = parse_time_input("1700000000123").unwrap();
        assert_eq!(millis.timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn parse_time_accepts_rfc3339() {
        let dt = parse_time_input("2026-01-01T00:00:00Z").unwrap();
        assert_eq!(dt.timestamp(), 1_767_225_600);
        let offset = parse_time_input("2026-01-01T02:00:00+02:00").unwrap();
        assert_eq!(offset, dt);
    }

    #[test]
    fn parse_time_rejects_garbage() {
        assert!(parse_time_input("yesterday").is_err());
    }

    #[test]
    fn config_path_is_required() {
        let err = require_config(None).unwrap_err();
        assert!(err.contains("TICKSTORE_CONFIG"));
    }
}
