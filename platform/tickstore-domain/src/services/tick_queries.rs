//! Reference implementations of the temporal queries over an in-memory tick set.
//!
//! These define the ordering contract every store must honour:
//! - latest: max `event_time`, then max `ingestion_time`, then max `id`.
//! - nearest: min `|event_time - target|`, then earlier `event_time`, then min
//!   `ingestion_time`, then min `id`.

use crate::value_objects::price_stats::{NearestTick, RangeExtremes, SymbolSummary};
use crate::value_objects::tick::StoredTick;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

/// Fractional digits kept by averages (matches the persisted price scale).
pub const AVERAGE_SCALE: u32 = 8;

pub fn latest<'a, I>(ticks: I, symbol: &str) -> Option<&'a StoredTick>
where
    I: IntoIterator<Item = &'a StoredTick>,
{
    ticks
        .into_iter()
        .filter(|t| t.symbol() == symbol)
        .max_by_key(|t| (t.event_time(), t.ingestion_time, t.id))
}

pub fn nearest<'a, I>(ticks: I, symbol: &str, target: DateTime<Utc>) -> Option<NearestTick>
where
    I: IntoIterator<Item = &'a StoredTick>,
{
    pick_nearest(ticks.into_iter().filter(|t| t.symbol() == symbol), target)
}

/// Chooses the nearest tick among `candidates` without filtering by symbol.
pub fn pick_nearest<'a, I>(candidates: I, target: DateTime<Utc>) -> Option<NearestTick>
where
    I: IntoIterator<Item = &'a StoredTick>,
{
    candidates
        .into_iter()
        .map(|t| (abs_distance(t.event_time(), target), t))
        .min_by_key(|(distance, t)| (*distance, t.event_time(), t.ingestion_time, t.id))
        .map(|(distance, t)| NearestTick {
            tick: t.clone(),
            distance_ms: distance.num_milliseconds(),
        })
}

pub fn range_extremes<'a, I>(
    ticks: I,
    symbol: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<RangeExtremes>
where
    I: IntoIterator<Item = &'a StoredTick>,
{
    let mut acc: Option<Accumulator> = None;
    for tick in ticks {
        if tick.symbol() != symbol || tick.event_time() < start || tick.event_time() >= end {
            continue;
        }
        match acc.as_mut() {
            Some(acc) => acc.push(tick),
            None => acc = Some(Accumulator::new(tick)),
        }
    }

    acc.map(|acc| RangeExtremes {
        symbol: symbol.to_string(),
        start,
        end,
        min_price: acc.min,
        max_price: acc.max,
        count: acc.count,
        first_event_time: acc.first,
        last_event_time: acc.last,
    })
}

pub fn summarize<'a, I>(ticks: I) -> Vec<SymbolSummary>
where
    I: IntoIterator<Item = &'a StoredTick>,
{
    let mut by_symbol: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for tick in ticks {
        by_symbol
            .entry(tick.symbol())
            .and_modify(|acc| acc.push(tick))
            .or_insert_with(|| Accumulator::new(tick));
    }

    by_symbol
        .into_iter()
        .map(|(symbol, acc)| SymbolSummary {
            symbol: symbol.to_string(),
            count: acc.count,
            min_price: acc.min,
            max_price: acc.max,
            avg_price: average(acc.sum, acc.count),
            first_event_time: acc.first,
            last_event_time: acc.last,
        })
        .collect()
}

/// Exact mean rounded half away from zero to [`AVERAGE_SCALE`] digits.
pub fn average(sum: Decimal, count: u64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    (sum / Decimal::from(count))
        .round_dp_with_strategy(AVERAGE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn abs_distance(a: DateTime<Utc>, b: DateTime<Utc>) -> Duration {
    let delta = a.signed_duration_since(b);
    if delta < Duration::zero() {
        -delta
    } else {
        delta
    }
}

struct Accumulator {
    count: u64,
    min: Decimal,
    max: Decimal,
    sum: Decimal,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
}

impl Accumulator {
    fn new(tick: &StoredTick) -> Self {
        Self {
            count: 1,
            min: tick.price(),
            max: tick.price(),
            sum: tick.price(),
            first: tick.event_time(),
            last: tick.event_time(),
        }
    }

    fn push(&mut self, tick: &StoredTick) {
        let price = tick.price();
        self.count += 1;
        self.min = self.min.min(price);
        self.max = self.max.max(price);
        self.sum += price;
        self.first = self.first.min(tick.event_time());
        self.last = self.last.max(tick.event_time());
    }
}

#[cfg(test)]
mod tests {
    use super::{average, latest, nearest, range_extremes, summarize};
    use crate::value_objects::tick::{StoredTick, Tick};
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn stored(id: i64, symbol: &str, secs: i64, price: Decimal) -> StoredTick {
        StoredTick {
            id,
            tick: Tick::new(symbol, price, at(secs)).unwrap(),
            ingestion_time: at(1_000_000 + id),
        }
    }

    #[test]
    fn latest_uses_event_time_not_insert_order() {
        let ticks = vec![
            stored(1, "BTCUSDT", 30, dec!(3)),
            stored(2, "BTCUSDT", 10, dec!(1)),
            stored(3, "ETHUSDT", 99, dec!(9)),
        ];
        let found = latest(&ticks, "BTCUSDT").unwrap();
        assert_eq!(found.id, 1);
        assert!(latest(&ticks, "SOLUSDT").is_none());
    }

    #[test]
    fn latest_breaks_event_time_ties_by_latest_ingestion() {
        let ticks = vec![
            stored(1, "BTCUSDT", 30, dec!(3)),
            stored(2, "BTCUSDT", 30, dec!(4)),
        ];
        assert_eq!(latest(&ticks, "BTCUSDT").unwrap().id, 2);
    }

    #[test]
    fn nearest_prefers_earlier_tick_when_equidistant() {
        let ticks = vec![
            stored(1, "BTCUSDT", 30, dec!(3)),
            stored(2, "BTCUSDT", 10, dec!(1)),
        ];
        let found = nearest(&ticks, "BTCUSDT", at(20)).unwrap();
        assert_eq!(found.tick.id, 2);
        assert_eq!(found.distance_ms, 10_000);
    }

    #[test]
    fn nearest_handles_targets_outside_the_data() {
        let ticks = vec![
            stored(1, "BTCUSDT", 10, dec!(1)),
            stored(2, "BTCUSDT", 20, dec!(2)),
        ];
        assert_eq!(nearest(&ticks, "BTCUSDT", at(0)).unwrap().tick.id, 1);
        assert_eq!(nearest(&ticks, "BTCUSDT", at(500)).unwrap().tick.id, 2);
        assert!(nearest(&ticks, "ETHUSDT", at(0)).is_none());
    }

    #[test]
    fn range_is_half_open_and_ignores_out_of_window_prices() {
        let ticks = vec![
            stored(1, "BTCUSDT", 10, dec!(100)),
            stored(2, "BTCUSDT", 20, dec!(5)),
            stored(3, "BTCUSDT", 30, dec!(7)),
            stored(4, "BTCUSDT", 45, dec!(1)),
        ];
        let range = range_extremes(&ticks, "BTCUSDT", at(15), at(40)).unwrap();
        assert_eq!(range.count, 2);
        assert_eq!(range.min_price, dec!(5));
        assert_eq!(range.max_price, dec!(7));
        assert_eq!(range.first_event_time, at(20));
        assert_eq!(range.last_event_time, at(30));

        assert!(range_extremes(&ticks, "BTCUSDT", at(30), at(30)).is_none());
        assert_eq!(
            range_extremes(&ticks, "BTCUSDT", at(30), at(45)).unwrap().count,
            1
        );
    }

    #[test]
    fn summarize_orders_by_symbol_and_averages_exactly() {
        let ticks = vec![
            stored(1, "ETHUSDT", 5, dec!(0.1)),
            stored(2, "BTCUSDT", 10, dec!(10)),
            stored(3, "ETHUSDT", 1, dec!(0.2)),
            stored(4, "ETHUSDT", 9, dec!(0.3)),
        ];
        let summary = summarize(&ticks);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].symbol, "BTCUSDT");
        assert_eq!(summary[1].symbol, "ETHUSDT");
        assert_eq!(summary[1].count, 3);
        assert_eq!(summary[1].avg_price, dec!(0.2));
        assert_eq!(summary[1].first_event_time, at(1));
        assert_eq!(summary[1].last_event_time, at(9));
    }

    #[test]
    fn average_rounds_to_eight_digits() {
        assert_eq!(average(dec!(1), 3), dec!(0.33333333));
        assert_eq!(average(dec!(2), 3), dec!(0.66666667));
        assert_eq!(average(dec!(5), 0), Decimal::ZERO);
    }
}
