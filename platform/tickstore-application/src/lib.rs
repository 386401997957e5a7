pub mod config;
pub mod connector;
pub mod query;
pub mod reporting;
