use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("disconnected: {0}")]
    Disconnected(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("protocol: {0}")]
    Protocol(String),
}

/// Opens venue connections subscribed to a set of symbols.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn connect(&self, symbols: &[String]) -> Result<Box<dyn FeedConnection>, StreamError>;
}

/// One live, subscribed venue connection.
#[async_trait]
pub trait FeedConnection: Send {
    /// Next raw text payload. `Ok(None)` means the venue ended the stream.
    async fn next_message(&mut self) -> Result<Option<String>, StreamError>;

    /// Best-effort close; errors are swallowed.
    async fn close(&mut self);
}
