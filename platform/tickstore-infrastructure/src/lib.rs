#[cfg(feature = "realtime-binance")]
pub mod market_stream;
pub mod persistence;
