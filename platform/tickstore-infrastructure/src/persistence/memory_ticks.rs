use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tickstore_domain::repositories::tick_store::{StoreError, TickStore};
use tickstore_domain::services::tick_queries;
use tickstore_domain::value_objects::price_stats::{NearestTick, RangeExtremes, SymbolSummary};
use tickstore_domain::value_objects::tick::{StoredTick, Tick};

/// Non-durable tick store backed by a vector. Used for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryTickStore {
    ticks: RwLock<Vec<StoredTick>>,
}

impl MemoryTickStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ticks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.read().is_empty()
    }

    pub fn snapshot(&self) -> Vec<StoredTick> {
        self.ticks.read().clone()
    }
}

impl TickStore for MemoryTickStore {
    fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn write(&self, tick: &Tick) -> Result<StoredTick, StoreError> {
        let mut ticks = self.ticks.write();
        let (id, ingestion_time) = match ticks.last() {
            // Keep ingestion_time non-decreasing even if the wall clock steps back.
            Some(last) => (last.id + 1, Utc::now().max(last.ingestion_time)),
            None => (1, Utc::now()),
        };
        let stored = StoredTick {
            id,
            tick: tick.clone(),
            ingestion_time,
        };
        ticks.push(stored.clone());
        Ok(stored)
    }

    fn latest(&self, symbol: &str) -> Result<Option<StoredTick>, StoreError> {
        let ticks = self.ticks.read();
        Ok(tick_queries::latest(ticks.iter(), symbol).cloned())
    }

    fn nearest(
        &self,
        symbol: &str,
        target: DateTime<Utc>,
    ) -> Result<Option<NearestTick>, StoreError> {
        let ticks = self.ticks.read();
        Ok(tick_queries::nearest(ticks.iter(), symbol, target))
    }

    fn range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<RangeExtremes>, StoreError> {
        let ticks = self.ticks.read();
        Ok(tick_queries::range_extremes(ticks.iter(), symbol, start, end))
    }

    fn summary(&self) -> Result<Vec<SymbolSummary>, StoreError> {
        let ticks = self.ticks.read();
        Ok(tick_queries::summarize(ticks.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryTickStore;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tickstore_domain::repositories::tick_store::TickStore;
    use tickstore_domain::value_objects::tick::Tick;

    #[test]
    fn write_appends_without_deduplication() {
        let store = MemoryTickStore::new();
        let tick = Tick::new("BTCUSDT", dec!(1.5), Utc.timestamp_opt(10, 0).unwrap()).unwrap();
        let first = store.write(&tick).unwrap();
        let second = store.write(&tick).unwrap();
        assert_eq!(store.len(), 2);
        assert_ne!(first.id, second.id);
        assert!(second.ingestion_time >= first.ingestion_time);
        assert_eq!(store.summary().unwrap()[0].count, 2);
    }

    #[test]
    fn reads_on_empty_store_return_no_data() {
        let store = MemoryTickStore::new();
        let t = Utc.timestamp_opt(0, 0).unwrap();
        assert!(store.latest("BTCUSDT").unwrap().is_none());
        assert!(store.nearest("BTCUSDT", t).unwrap().is_none());
        assert!(store.range("BTCUSDT", t, t).unwrap().is_none());
        assert!(store.summary().unwrap().is_empty());
    }
}
