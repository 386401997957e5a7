pub mod price_stats;
pub mod tick;
