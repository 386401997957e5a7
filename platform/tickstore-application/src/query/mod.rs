use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::time::Instant;
use tickstore_domain::repositories::tick_store::{StoreError, TickStore};
use tickstore_domain::value_objects::price_stats::{NearestTick, RangeExtremes, SymbolSummary};
use tickstore_domain::value_objects::tick::{normalize_symbol, StoredTick};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid range: end {end} is before start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Read-side use cases over a [`TickStore`]. Symbols are normalized before they reach the
/// store, so `"btcusdt"` and `" BTCUSDT "` address the same series.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn TickStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn TickStore>) -> Self {
        Self { store }
    }

    pub fn latest(&self, symbol: &str) -> Result<Option<StoredTick>, QueryError> {
        let symbol = normalize_symbol(symbol);
        let _span = tracing::debug_span!("app.query.latest", symbol = %symbol).entered();
        timed("latest", || self.store.latest(&symbol))
    }

    pub fn nearest(
        &self,
        symbol: &str,
        target: DateTime<Utc>,
    ) -> Result<Option<NearestTick>, QueryError> {
        let symbol = normalize_symbol(symbol);
        let _span =
            tracing::debug_span!("app.query.nearest", symbol = %symbol, target = %target).entered();
        timed("nearest", || self.store.nearest(&symbol, target))
    }

    /// Extremes over `[start, end)`. `start == end` is an empty window, not an error.
    pub fn range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<RangeExtremes>, QueryError> {
        if end < start {
            return Err(QueryError::InvalidRange { start, end });
        }
        let symbol = normalize_symbol(symbol);
        let _span = tracing::debug_span!(
            "app.query.range",
            symbol = %symbol,
            start = %start,
            end = %end
        )
        .entered();
        if start == end {
            return Ok(None);
        }
        timed("range", || self.store.range(&symbol, start, end))
    }

    /// `range(symbol, start, start + width)`.
    pub fn range_window(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        width: Duration,
    ) -> Result<Option<RangeExtremes>, QueryError> {
        let end = start
            .checked_add_signed(width)
            .ok_or(QueryError::InvalidRange { start, end: start })?;
        self.range(symbol, start, end)
    }

    pub fn summary(&self) -> Result<Vec<SymbolSummary>, QueryError> {
        let _span = tracing::debug_span!("app.query.summary").entered();
        timed("summary", || self.store.summary())
    }
}

fn timed<T>(
    op: &'static str,
    f: impl FnOnce() -> Result<T, StoreError>,
) -> Result<T, QueryError> {
    let start = Instant::now();
    let res = f();
    let outcome = if res.is_ok() { "ok" } else { "error" };
    metrics::counter!("tickstore.query.calls_total", "op" => op, "result" => outcome).increment(1);
    metrics::histogram!("tickstore.query.duration_ms", "op" => op)
        .record(start.elapsed().as_millis() as f64);
    res.map_err(QueryError::from)
}
