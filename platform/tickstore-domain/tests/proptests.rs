use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tickstore_domain::services::tick_queries::{latest, nearest, range_extremes, summarize};
use tickstore_domain::value_objects::tick::{StoredTick, Tick};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn build(symbol: &str, samples: &[(i64, u32)]) -> Vec<StoredTick> {
    samples
        .iter()
        .enumerate()
        .map(|(idx, (secs, cents))| StoredTick {
            id: idx as i64 + 1,
            tick: Tick::new(symbol, Decimal::new(i64::from(*cents) + 1, 2), at(*secs)).unwrap(),
            ingestion_time: at(10_000_000 + idx as i64),
        })
        .collect()
}

fn distance_secs(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (a.timestamp() - b.timestamp()).abs()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn latest_has_maximum_event_time(samples in prop::collection::vec((0i64..10_000, 0u32..1_000_000), 1..60)) {
        let ticks = build("BTCUSDT", &samples);
        let found = latest(&ticks, "BTCUSDT").unwrap();
        let max_ts = ticks.iter().map(|t| t.event_time()).max().unwrap();
        prop_assert_eq!(found.event_time(), max_ts);
    }

    #[test]
    fn nearest_minimizes_distance_and_prefers_earlier(
        samples in prop::collection::vec((0i64..10_000, 0u32..1_000_000), 1..60),
        target in 0i64..10_000,
    ) {
        let ticks = build("BTCUSDT", &samples);
        let found = nearest(&ticks, "BTCUSDT", at(target)).unwrap();
        let best = ticks.iter().map(|t| distance_secs(t.event_time(), at(target))).min().unwrap();
        prop_assert_eq!(found.distance_ms, best * 1000);
        let earliest_at_best = ticks
            .iter()
            .filter(|t| distance_secs(t.event_time(), at(target)) == best)
            .map(|t| t.event_time())
            .min()
            .unwrap();
        prop_assert_eq!(found.tick.event_time(), earliest_at_best);
    }

    #[test]
    fn range_counts_exactly_the_half_open_window(
        samples in prop::collection::vec((0i64..1_000, 0u32..1_000_000), 1..60),
        start in 0i64..1_000,
        width in 0i64..500,
    ) {
        let ticks = build("ETHUSDT", &samples);
        let end = start + width;
        let inside: Vec<&StoredTick> = ticks
            .iter()
            .filter(|t| t.event_time() >= at(start) && t.event_time() < at(end))
            .collect();

        match range_extremes(&ticks, "ETHUSDT", at(start), at(end)) {
            None => prop_assert!(inside.is_empty()),
            Some(range) => {
                prop_assert_eq!(range.count as usize, inside.len());
                prop_assert_eq!(range.min_price, inside.iter().map(|t| t.price()).min().unwrap());
                prop_assert_eq!(range.max_price, inside.iter().map(|t| t.price()).max().unwrap());
                prop_assert!(range.first_event_time >= at(start));
                prop_assert!(range.last_event_time < at(end));
            }
        }
    }

    #[test]
    fn summary_average_lies_between_min_and_max(
        btc in prop::collection::vec((0i64..1_000, 0u32..1_000_000), 1..40),
        eth in prop::collection::vec((0i64..1_000, 0u32..1_000_000), 1..40),
    ) {
        let mut ticks = build("ETHUSDT", &eth);
        ticks.extend(build("BTCUSDT", &btc));
        let summary = summarize(&ticks);
        prop_assert_eq!(summary.len(), 2);
        prop_assert_eq!(summary[0].symbol.as_str(), "BTCUSDT");
        prop_assert_eq!(summary[0].count as usize, btc.len());
        prop_assert_eq!(summary[1].count as usize, eth.len());
        for entry in &summary {
            prop_assert!(entry.min_price <= entry.avg_price);
            prop_assert!(entry.avg_price <= entry.max_price);
        }
    }
}
