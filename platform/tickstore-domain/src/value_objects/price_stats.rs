use crate::value_objects::tick::StoredTick;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Result of a nearest-to-time lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NearestTick {
    #[serde(flatten)]
    pub tick: StoredTick,
    /// `|event_time - target|` in milliseconds.
    pub distance_ms: i64,
}

impl NearestTick {
    pub fn distance(&self) -> Duration {
        Duration::milliseconds(self.distance_ms)
    }
}

/// Price extremes over a half-open interval `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeExtremes {
    pub symbol: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub count: u64,
    pub first_event_time: DateTime<Utc>,
    pub last_event_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolSummary {
    pub symbol: String,
    pub count: u64,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub avg_price: Decimal,
    pub first_event_time: DateTime<Utc>,
    pub last_event_time: DateTime<Utc>,
}
