pub mod market_stream;
pub mod tick_store;
