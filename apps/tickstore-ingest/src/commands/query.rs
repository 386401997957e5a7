use super::common::{parse_time_input, print_json, require_config};
use super::QueryCommand;
use crate::infra::build_store;
use std::path::Path;
use tickstore_application::query::QueryService;

pub(super) fn run_query(config_path: Option<&Path>, command: QueryCommand) -> Result<(), String> {
    let config = require_config(config_path)?;
    let queries = QueryService::new(build_store(&config.db)?);

    match command {
        QueryCommand::Latest { symbol } => print_json(
            &queries
                .latest(&symbol)
                .map_err(|err| format!("latest query failed: {err}"))?,
        ),
        QueryCommand::Nearest { symbol, at } => {
            let target = parse_time_input(&at)?;
            print_json(
                &queries
                    .nearest(&symbol, target)
                    .map_err(|err| format!("nearest query failed: {err}"))?,
            )
        }
        QueryCommand::Range { symbol, start, end } => {
            let start = parse_time_input(&start)?;
            let end = parse_time_input(&end)?;
            print_json(
                &queries
                    .range(&symbol, start, end)
                    .map_err(|err| format!("range query failed: {err}"))?,
            )
        }
        QueryCommand::Summary => print_json(
            &queries
                .summary()
                .map_err(|err| format!("summary query failed: {err}"))?,
        ),
    }
}
