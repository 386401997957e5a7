use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use rand::RngCore;
use rustls::crypto::{ring, CryptoProvider};
use std::time::Duration;
use tickstore_domain::repositories::market_stream::{FeedConnection, FeedTransport, StreamError};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub const BINANCE_SPOT_STREAM_URL: &str = "wss://stream.binance.com:9443/ws";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Binance spot ticker feed: one websocket, one `SUBSCRIBE` listing `<symbol>@ticker` per
/// symbol.
#[derive(Debug, Clone)]
pub struct BinanceTickerTransport {
    url: String,
    connect_timeout: Duration,
    idle_timeout: Duration,
}

impl BinanceTickerTransport {
    pub fn new(url: impl Into<String>, connect_timeout: Duration, idle_timeout: Duration) -> Self {
        install_crypto_provider();
        Self {
            url: url.into(),
            connect_timeout,
            idle_timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedTransport for BinanceTickerTransport {
    async fn connect(&self, symbols: &[String]) -> Result<Box<dyn FeedConnection>, StreamError> {
        if symbols.is_empty() {
            return Err(StreamError::Protocol("no symbols to subscribe".to_string()));
        }

        let subscribe = subscribe_request(symbols, random_id());
        let handshake = async {
            let (mut socket, _resp) = tokio_tungstenite::connect_async(self.url.as_str())
                .await
                .map_err(|e| StreamError::Connect(format!("ws connect failed: {e}")))?;
            socket
                .send(Message::Text(subscribe))
                .await
                .map_err(|e| StreamError::Connect(format!("ws subscribe failed: {e}")))?;
            Ok::<_, StreamError>(socket)
        };
        // The budget covers the handshake and the SUBSCRIBE send.
        let socket = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| {
                StreamError::Timeout(format!(
                    "ws connect to {} exceeded {:?}",
                    self.url, self.connect_timeout
                ))
            })??;

        tracing::debug!(url = %self.url, streams = ?ticker_stream_ids(symbols), "subscribed");
        Ok(Box::new(BinanceTickerConnection {
            socket,
            idle_timeout: self.idle_timeout,
        }))
    }
}

/// Selects the ring rustls provider for `wss://` feeds. Another provider already installed
/// by the process is left in place.
fn install_crypto_provider() {
    let _ = CryptoProvider::install_default(ring::default_provider());
}

struct BinanceTickerConnection {
    socket: WsStream,
    idle_timeout: Duration,
}

#[async_trait]
impl FeedConnection for BinanceTickerConnection {
    async fn next_message(&mut self) -> Result<Option<String>, StreamError> {
        loop {
            let next = tokio::time::timeout(self.idle_timeout, self.socket.next())
                .await
                .map_err(|_| {
                    StreamError::Timeout(format!("no message within {:?}", self.idle_timeout))
                })?;
            let Some(msg) = next else {
                return Ok(None);
            };
            let msg = msg.map_err(|e| StreamError::Disconnected(e.to_string()))?;

            match msg {
                Message::Text(text) => return Ok(Some(text)),
                Message::Ping(payload) => {
                    // Binance drops connections that miss pongs.
                    self.socket
                        .send(Message::Pong(payload))
                        .await
                        .map_err(|e| StreamError::Disconnected(format!("pong failed: {e}")))?;
                }
                Message::Pong(_) => {}
                Message::Binary(_) => {}
                Message::Close(frame) => {
                    let reason = frame
                        .map(|f| format!("server closed ({}): {}", u16::from(f.code), f.reason))
                        .unwrap_or_else(|| "server closed".to_string());
                    return Err(StreamError::Disconnected(reason));
                }
                Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.socket.close(None).await;
    }
}

/// `btcusdt@ticker` style identifiers, one per symbol.
pub fn ticker_stream_ids(symbols: &[String]) -> Vec<String> {
    symbols
        .iter()
        .map(|s| format!("{}@ticker", s.trim().to_ascii_lowercase()))
        .collect()
}

pub fn subscribe_request(symbols: &[String], id: u32) -> String {
    serde_json::json!({
        "method": "SUBSCRIBE",
        "params": ticker_stream_ids(symbols),
        "id": id,
    })
    .to_string()
}

fn random_id() -> u32 {
    rand::thread_rng().next_u32()
}
