use crate::query::{QueryError, QueryService};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::time::Instant;
use tickstore_domain::value_objects::price_stats::{NearestTick, RangeExtremes, SymbolSummary};
use tickstore_domain::value_objects::tick::{normalize_symbol, StoredTick};
use tracing::info_span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// How far back the "price N seconds ago" lookup targets.
    pub lookback: Duration,
    /// Width of the trailing range window ending at report time.
    pub window: Duration,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            lookback: Duration::seconds(30),
            window: Duration::seconds(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub latest: Option<StoredTick>,
    pub lookback_target: DateTime<Utc>,
    pub nearest_to_lookback: Option<NearestTick>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub window: Option<RangeExtremes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceReport {
    pub generated_at: DateTime<Utc>,
    pub lookback_seconds: i64,
    pub window_seconds: i64,
    pub symbols: Vec<SymbolReport>,
    pub summary: Vec<SymbolSummary>,
}

/// Snapshot of every requested symbol as of `now`: latest price, the price nearest
/// `now - lookback`, and extremes over `[now - window, now)`; followed by the store-wide
/// per-symbol summary.
pub fn build_report(
    queries: &QueryService,
    symbols: &[String],
    now: DateTime<Utc>,
    options: ReportOptions,
) -> Result<PriceReport, QueryError> {
    let _span = info_span!("app.report.build", symbols = symbols.len()).entered();
    let stage_start = Instant::now();

    let lookback_target = before(now, options.lookback)?;
    let window_start = before(now, options.window)?;

    let mut reports = Vec::with_capacity(symbols.len());
    for raw in symbols {
        let symbol = normalize_symbol(raw);
        let latest = queries.latest(&symbol)?;
        let nearest_to_lookback = queries.nearest(&symbol, lookback_target)?;
        let window = queries.range_window(&symbol, window_start, options.window)?;
        if latest.is_none() {
            tracing::warn!(symbol = %symbol, "no ticks stored for symbol");
        }
        reports.push(SymbolReport {
            symbol,
            latest,
            lookback_target,
            nearest_to_lookback,
            window_start,
            window_end: now,
            window,
        });
    }
    let summary = queries.summary()?;

    metrics::histogram!("tickstore.report.build_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    Ok(PriceReport {
        generated_at: now,
        lookback_seconds: options.lookback.num_seconds(),
        window_seconds: options.window.num_seconds(),
        symbols: reports,
        summary,
    })
}

fn before(now: DateTime<Utc>, span: Duration) -> Result<DateTime<Utc>, QueryError> {
    now.checked_sub_signed(span)
        .ok_or(QueryError::InvalidRange { start: now, end: now })
}
