use crate::config::FeedConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tickstore_domain::repositories::market_stream::{FeedConnection, FeedTransport};
use tickstore_domain::repositories::tick_store::{StoreError, TickStore};
use tickstore_domain::services::decoder::{DecodeError, Decoded, TickDecoder};
use tickstore_domain::value_objects::tick::Tick;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorState {
    Disconnected,
    Connecting,
    Connected,
    Shutdown,
}

impl ConnectorState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectorState::Disconnected => "disconnected",
            ConnectorState::Connecting => "connecting",
            ConnectorState::Connected => "connected",
            ConnectorState::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    pub symbols: Vec<String>,
    pub reconnect_delay: Duration,
}

impl ConnectorConfig {
    pub fn from_feed(feed: &FeedConfig) -> Self {
        Self {
            symbols: feed.normalized_symbols(),
            reconnect_delay: feed.reconnect_delay(),
        }
    }
}

/// Counters accumulated over the connector's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub accepted: u64,
    pub ignored: u64,
    pub malformed: u64,
    pub write_failures: u64,
    pub reconnects: u64,
}

/// Published on every state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectorStatus {
    pub state: ConnectorState,
    pub stats: IngestStats,
    pub at: DateTime<Utc>,
    pub last_error: Option<String>,
}

enum SessionEnd {
    Shutdown,
    Lost(String),
}

/// Keeps one live subscription for a fixed symbol set and appends every accepted tick to the
/// store. Reconnects forever with a fixed delay until the shutdown token fires.
pub struct StreamConnector {
    transport: Arc<dyn FeedTransport>,
    store: Arc<dyn TickStore>,
    decoder: TickDecoder,
    config: ConnectorConfig,
    state: ConnectorState,
    stats: IngestStats,
    status_tx: Option<UnboundedSender<ConnectorStatus>>,
}

impl StreamConnector {
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        store: Arc<dyn TickStore>,
        config: ConnectorConfig,
    ) -> Self {
        Self {
            transport,
            store,
            decoder: TickDecoder::new(),
            config,
            state: ConnectorState::Disconnected,
            stats: IngestStats::default(),
            status_tx: None,
        }
    }

    /// Ensures the store schema, then builds the connector. A schema failure is fatal: no
    /// connector is returned and the feed is never contacted.
    pub fn bootstrap(
        transport: Arc<dyn FeedTransport>,
        store: Arc<dyn TickStore>,
        config: ConnectorConfig,
    ) -> Result<Self, StoreError> {
        if let Err(err) = store.ensure_schema() {
            tracing::error!(error = %err, "schema bootstrap failed");
            return Err(err);
        }
        Ok(Self::new(transport, store, config))
    }

    pub fn with_status_channel(mut self, tx: UnboundedSender<ConnectorStatus>) -> Self {
        self.status_tx = Some(tx);
        self
    }

    pub fn state(&self) -> ConnectorState {
        self.state
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Drives connect, read and reconnect until `shutdown` is cancelled.
    ///
    /// The first attempt is immediate; every later one waits `reconnect_delay`. A store write
    /// already in flight when shutdown fires is allowed to finish.
    pub async fn run(mut self, shutdown: CancellationToken) -> IngestStats {
        tracing::info!(
            symbols = ?self.config.symbols,
            reconnect_delay_ms = self.config.reconnect_delay.as_millis() as u64,
            "stream connector starting"
        );

        let mut attempt: u64 = 0;
        loop {
            if shutdown.is_cancelled() {
                break;
            }
            if attempt > 0 {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                }
                self.stats.reconnects += 1;
                metrics::counter!("tickstore.ingest.reconnects_total").increment(1);
            }
            attempt += 1;

            self.transition(ConnectorState::Connecting, None);
            let connect_start = Instant::now();
            let connected = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                res = self.transport.connect(&self.config.symbols) => res,
            };
            let mut conn = match connected {
                Ok(conn) => conn,
                Err(err) => {
                    metrics::counter!("tickstore.ingest.connect_failures_total").increment(1);
                    tracing::warn!(attempt, error = %err, "feed connect failed");
                    self.transition(ConnectorState::Disconnected, Some(err.to_string()));
                    continue;
                }
            };
            metrics::histogram!("tickstore.ingest.connect_ms")
                .record(connect_start.elapsed().as_millis() as f64);
            self.transition(ConnectorState::Connected, None);

            let span = tracing::info_span!("app.connector.session", attempt);
            let end = self
                .run_session(conn.as_mut(), &shutdown)
                .instrument(span)
                .await;
            conn.close().await;

            match end {
                SessionEnd::Shutdown => break,
                SessionEnd::Lost(reason) => {
                    tracing::warn!(attempt, reason = %reason, "feed connection lost");
                    self.transition(ConnectorState::Disconnected, Some(reason));
                }
            }
        }

        self.transition(ConnectorState::Shutdown, None);
        tracing::info!(
            accepted = self.stats.accepted,
            ignored = self.stats.ignored,
            malformed = self.stats.malformed,
            write_failures = self.stats.write_failures,
            reconnects = self.stats.reconnects,
            "stream connector stopped"
        );
        self.stats
    }

    async fn run_session(
        &mut self,
        conn: &mut dyn FeedConnection,
        shutdown: &CancellationToken,
    ) -> SessionEnd {
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return SessionEnd::Shutdown,
                next = conn.next_message() => next,
            };
            match next {
                Ok(Some(raw)) => self.handle_message(&raw).await,
                Ok(None) => return SessionEnd::Lost("stream ended".to_string()),
                Err(err) => return SessionEnd::Lost(err.to_string()),
            }
        }
    }

    async fn handle_message(&mut self, raw: &str) {
        match self.decoder.decode(raw) {
            Ok(Decoded::Tick(tick)) => self.persist(tick).await,
            Ok(Decoded::Ignored) => {
                self.stats.ignored += 1;
                metrics::counter!("tickstore.ingest.ignored_total").increment(1);
            }
            Err(DecodeError::Malformed { reason }) => {
                self.stats.malformed += 1;
                metrics::counter!("tickstore.ingest.malformed_total").increment(1);
                tracing::warn!(reason = %reason, "dropping malformed feed message");
            }
        }
    }

    async fn persist(&mut self, tick: Tick) {
        let store = Arc::clone(&self.store);
        let symbol = tick.symbol().to_string();
        let write = tokio::task::spawn_blocking(move || store.write(&tick));
        match write.await {
            Ok(Ok(stored)) => {
                self.stats.accepted += 1;
                metrics::counter!("tickstore.ingest.accepted_total").increment(1);
                tracing::debug!(
                    symbol = %symbol,
                    id = stored.id,
                    price = %stored.price(),
                    "tick stored"
                );
            }
            Ok(Err(err)) => {
                self.stats.write_failures += 1;
                metrics::counter!("tickstore.ingest.write_failures_total").increment(1);
                tracing::error!(symbol = %symbol, error = %err, "tick write failed; dropped");
            }
            Err(err) => {
                self.stats.write_failures += 1;
                metrics::counter!("tickstore.ingest.write_failures_total").increment(1);
                tracing::error!(symbol = %symbol, error = %err, "tick write task aborted");
            }
        }
    }

    fn transition(&mut self, next: ConnectorState, last_error: Option<String>) {
        let prev = self.state;
        self.state = next;
        tracing::info!(from = prev.as_str(), to = next.as_str(), "connector state");
        if let Some(tx) = &self.status_tx {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(ConnectorStatus {
                state: next,
                stats: self.stats,
                at: Utc::now(),
                last_error,
            });
        }
    }
}
