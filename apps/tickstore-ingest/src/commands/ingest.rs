use super::common::{print_json, require_config};
use crate::infra::{build_store, build_transport};
use std::path::Path;
use tickstore_application::connector::{
    ConnectorConfig, ConnectorState, ConnectorStatus, IngestStats, StreamConnector,
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio_util::sync::CancellationToken;

/// Bootstraps the schema (fatal on failure) and streams ticks until Ctrl-C.
pub(super) fn run_ingest(config_path: Option<&Path>) -> Result<(), String> {
    let config = require_config(config_path)?;
    let store = build_store(&config.db)?;
    let table = store.table().to_string();
    let transport = build_transport(&config.feed)?;
    let connector_config = ConnectorConfig::from_feed(&config.feed);

    tracing::info!(
        url = %config.feed.url,
        table = %table,
        symbols = ?connector_config.symbols,
        "starting ingestion"
    );
    let connector = StreamConnector::bootstrap(transport, store, connector_config)
        .map_err(|err| format!("schema bootstrap failed for {table}: {err}"))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("tickstore-ingest")
        .build()
        .map_err(|err| format!("failed to start runtime: {err}"))?;
    let stats = runtime.block_on(ingest(connector));

    print_json(&stats)
}

async fn ingest(connector: StreamConnector) -> IngestStats {
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested");
                signal_token.cancel();
            }
            Err(err) => tracing::error!(error = %err, "failed to listen for ctrl-c"),
        }
    });

    let (tx, rx) = unbounded_channel();
    let watcher = tokio::spawn(watch_status(rx));
    let stats = connector.with_status_channel(tx).run(shutdown).await;
    // The connector owned the only sender, so the watcher drains and exits.
    if let Err(err) = watcher.await {
        tracing::warn!(error = %err, "status watcher failed");
    }
    stats
}

async fn watch_status(mut rx: UnboundedReceiver<ConnectorStatus>) {
    while let Some(status) = rx.recv().await {
        let connected = if status.state == ConnectorState::Connected {
            1.0
        } else {
            0.0
        };
        metrics::gauge!("tickstore.ingest.connected").set(connected);
        metrics::gauge!("tickstore.ingest.accepted").set(status.stats.accepted as f64);
        if let Some(err) = &status.last_error {
            tracing::debug!(
                state = status.state.as_str(),
                reconnects = status.stats.reconnects,
                error = %err,
                "connector status"
            );
        }
    }
}
