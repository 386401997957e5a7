mod common;
mod ingest;
mod migrate;
mod query;
mod report;

use std::path::PathBuf;

pub enum Command {
    Migrate {
        migrations_path: PathBuf,
    },
    Run,
    Query(QueryCommand),
    Report {
        lookback_seconds: i64,
        window_seconds: i64,
    },
}

pub enum QueryCommand {
    Latest { symbol: String },
    Nearest { symbol: String, at: String },
    Range { symbol: String, start: String, end: String },
    Summary,
}

pub fn run(command: Command, config: Option<PathBuf>) -> Result<(), String> {
    match command {
        Command::Migrate { migrations_path } => {
            migrate::run_migrate(config.as_deref(), &migrations_path)
        }
        Command::Run => ingest::run_ingest(config.as_deref()),
        Command::Query(query) => query::run_query(config.as_deref(), query),
        Command::Report {
            lookback_seconds,
            window_seconds,
        } => report::run_report(config.as_deref(), lookback_seconds, window_seconds),
    }
}
