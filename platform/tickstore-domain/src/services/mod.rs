pub mod decoder;
pub mod tick_queries;
