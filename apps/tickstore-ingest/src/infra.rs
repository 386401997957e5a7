use std::env;
use std::sync::Arc;
use tickstore_application::config::{DbConfig, FeedConfig};
use tickstore_domain::repositories::market_stream::FeedTransport;
use tickstore_infrastructure::persistence::postgres_ticks::PostgresTickStore;

pub const DB_URL_ENV: &str = "TICKSTORE_DB_URL";

/// Config value first, then `TICKSTORE_DB_URL`.
pub fn resolve_db_url(db: Option<&DbConfig>) -> Result<String, String> {
    match db.and_then(|db| db.url.as_deref()) {
        Some(url) if !url.trim().is_empty() => Ok(url.to_string()),
        _ => env::var(DB_URL_ENV).map_err(|_| {
            format!("missing db.url in config and env {DB_URL_ENV} is not set")
        }),
    }
}

pub fn build_store(db: &DbConfig) -> Result<Arc<PostgresTickStore>, String> {
    let db_url = resolve_db_url(Some(db))?;
    let store = PostgresTickStore::new(
        &db_url,
        db.table.clone(),
        db.pool_max_size,
        db.connect_timeout(),
    )
    .map_err(|err| format!("failed to open tick store: {err}"))?;
    Ok(Arc::new(store))
}

#[cfg(feature = "realtime-binance")]
pub fn build_transport(feed: &FeedConfig) -> Result<Arc<dyn FeedTransport>, String> {
    use tickstore_infrastructure::market_stream::binance::BinanceTickerTransport;

    Ok(Arc::new(BinanceTickerTransport::new(
        feed.url.clone(),
        feed.connect_timeout(),
        feed.idle_timeout(),
    )))
}

#[cfg(not(feature = "realtime-binance"))]
pub fn build_transport(_feed: &FeedConfig) -> Result<Arc<dyn FeedTransport>, String> {
    Err("live ingestion requires tickstore-ingest feature `realtime-binance`".to_string())
}
