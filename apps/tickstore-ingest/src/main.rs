mod commands;
mod infra;
mod obs;

use clap::{Parser, Subcommand};
use commands::{Command, QueryCommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tickstore")]
#[command(
    about = "Continuous ticker ingestion into PostgreSQL, with latest/nearest/range/summary queries.",
    version,
    arg_required_else_help = true
)]
#[command(
    after_help = "Examples:\n  tickstore --config platform/ops/configs/sample.toml migrate\n  tickstore --config platform/ops/configs/sample.toml run\n  tickstore --config platform/ops/configs/sample.toml query latest --symbol BTCUSDT\n  tickstore --config platform/ops/configs/sample.toml query range --symbol BTCUSDT --start 2026-01-01T00:00:00Z --end 1767225660\n  tickstore --config platform/ops/configs/sample.toml report --lookback-seconds 30\n"
)]
struct Cli {
    /// TOML config file.
    #[arg(long, env = "TICKSTORE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log filter used when TICKSTORE_LOG is unset.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// text | json
    #[arg(long, default_value = "text", global = true)]
    log_format: String,

    /// Serve Prometheus metrics on host:port.
    #[arg(long, env = "TICKSTORE_METRICS_ADDR", global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Apply the SQL migration file to the target database.
    Migrate {
        #[arg(long, default_value = "platform/ops/migrations/0001_create_price_ticks.sql")]
        migrations_path: PathBuf,
    },
    /// Ensure the schema, then ingest live ticks until Ctrl-C.
    Run,
    /// Read stored ticks and print JSON.
    Query {
        #[command(subcommand)]
        query: CliQuery,
    },
    /// Latest, lookback and trailing-window snapshot for every configured symbol.
    Report {
        #[arg(long, default_value_t = 30)]
        lookback_seconds: i64,
        #[arg(long, default_value_t = 60)]
        window_seconds: i64,
    },
}

#[derive(Subcommand, Debug)]
enum CliQuery {
    Latest {
        #[arg(long)]
        symbol: String,
    },
    Nearest {
        #[arg(long)]
        symbol: String,
        /// Epoch seconds, epoch millis or RFC3339.
        #[arg(long)]
        at: String,
    },
    /// Extremes over [start, end).
    Range {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    Summary,
}

impl From<CliCommand> for Command {
    fn from(command: CliCommand) -> Self {
        match command {
            CliCommand::Migrate { migrations_path } => Command::Migrate { migrations_path },
            CliCommand::Run => Command::Run,
            CliCommand::Query { query } => Command::Query(match query {
                CliQuery::Latest { symbol } => QueryCommand::Latest { symbol },
                CliQuery::Nearest { symbol, at } => QueryCommand::Nearest { symbol, at },
                CliQuery::Range { symbol, start, end } => QueryCommand::Range { symbol, start, end },
                CliQuery::Summary => QueryCommand::Summary,
            }),
            CliCommand::Report {
                lookback_seconds,
                window_seconds,
            } => Command::Report {
                lookback_seconds,
                window_seconds,
            },
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    obs::init_tracing(&cli.log_level, &cli.log_format)?;
    obs::init_metrics(cli.metrics_addr.as_deref())?;
    commands::run(cli.command.into(), cli.config)
}
