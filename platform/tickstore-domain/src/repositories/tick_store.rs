use crate::value_objects::price_stats::{NearestTick, RangeExtremes, SymbolSummary};
use crate::value_objects::tick::{StoredTick, Tick};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("schema bootstrap failed: {0}")]
    Schema(String),
    #[error("write failed: {0}")]
    WriteFailed(String),
    #[error("query failed: {0}")]
    Query(String),
}

/// Append-only tick persistence.
///
/// Every call is a self-contained operation against the backend; implementations must be
/// safe to share between the ingestion task and any number of concurrent readers. Symbols
/// passed to the read methods are expected in canonical (upper-case) form.
pub trait TickStore: Send + Sync {
    /// Creates the tick table and the `(symbol, event_time)` index when absent.
    fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Appends one tick. Never deduplicates.
    fn write(&self, tick: &Tick) -> Result<StoredTick, StoreError>;

    fn latest(&self, symbol: &str) -> Result<Option<StoredTick>, StoreError>;

    fn nearest(
        &self,
        symbol: &str,
        target: DateTime<Utc>,
    ) -> Result<Option<NearestTick>, StoreError>;

    /// Extremes over `[start, end)`.
    fn range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<RangeExtremes>, StoreError>;

    /// One entry per distinct symbol, ordered by symbol ascending.
    fn summary(&self) -> Result<Vec<SymbolSummary>, StoreError>;
}
