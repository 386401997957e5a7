use super::common::require_config;
use crate::infra::resolve_db_url;
use std::path::Path;
use tokio_postgres::NoTls;

/// Applies a SQL file as-is. The config is optional here; without one the URL comes from
/// `TICKSTORE_DB_URL`.
pub(super) fn run_migrate(config_path: Option<&Path>, migrations_path: &Path) -> Result<(), String> {
    let db = match config_path {
        Some(_) => Some(require_config(config_path)?.db),
        None => None,
    };
    let db_url = resolve_db_url(db.as_ref())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("failed to start runtime: {err}"))?;
    runtime.block_on(migrate_db(&db_url, migrations_path))
}

async fn migrate_db(db_url: &str, migrations_path: &Path) -> Result<(), String> {
    let sql = std::fs::read_to_string(migrations_path).map_err(|err| {
        format!(
            "failed to read migrations file {}: {}",
            migrations_path.display(),
            err
        )
    })?;

    let (client, connection) = tokio_postgres::connect(db_url, NoTls)
        .await
        .map_err(|err| format!("failed to connect to postgres: {err}"))?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            tracing::error!(error = %err, "postgres connection error");
        }
    });

    client
        .batch_execute(&sql)
        .await
        .map_err(|err| format!("failed to execute migrations: {err}"))?;
    tracing::info!(path = %migrations_path.display(), "migrations applied");
    println!("migrations applied: {}", migrations_path.display());
    Ok(())
}
