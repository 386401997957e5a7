use super::common::{print_json, require_config};
use crate::infra::build_store;
use chrono::{Duration, Utc};
use std::path::Path;
use tickstore_application::query::QueryService;
use tickstore_application::reporting::{build_report, ReportOptions};

pub(super) fn run_report(
    config_path: Option<&Path>,
    lookback_seconds: i64,
    window_seconds: i64,
) -> Result<(), String> {
    let options = report_options(lookback_seconds, window_seconds)?;
    let config = require_config(config_path)?;
    let queries = QueryService::new(build_store(&config.db)?);

    let report = build_report(&queries, &config.feed.symbols, Utc::now(), options)
        .map_err(|err| format!("report failed: {err}"))?;
    print_json(&report)
}

fn report_options(lookback_seconds: i64, window_seconds: i64) -> Result<ReportOptions, String> {
    if lookback_seconds < 0 {
        return Err(format!("--lookback-seconds must be >= 0 (got {lookback_seconds})"));
    }
    if window_seconds <= 0 {
        return Err(format!("--window-seconds must be > 0 (got {window_seconds})"));
    }
    Ok(ReportOptions {
        lookback: Duration::try_seconds(lookback_seconds)
            .ok_or_else(|| format!("--lookback-seconds is too large (got {lookback_seconds})"))?,
        window: Duration::try_seconds(window_seconds)
            .ok_or_else(|| format!("--window-seconds is too large (got {window_seconds})"))?,
    })
}
