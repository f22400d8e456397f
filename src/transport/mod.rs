//! Message-transport adapters built on the Telegram Bot API:
//! digest delivery, channel-name resolution, and the long-poll
//! ingestion source.

pub mod telegram;

pub use telegram::{BotResolver, BotSink, UpdatesSource};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Request timeout - the API took too long to respond")]
    Timeout,

    #[error("Connection error - unable to reach the API")]
    Connect,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Delivery rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
}

pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// Delivers one assembled digest body to the configured destination.
#[async_trait::async_trait]
pub trait DigestSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, body: &str) -> SinkResult<()>;
}
