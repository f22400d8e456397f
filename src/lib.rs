//! Two-sided topic digest service: buffers messages from monitored
//! channels, clusters them into topics once per cycle, keeps only
//! topics corroborated by enough distinct channels, and posts one
//! balanced digest per cycle to a target channel.

pub mod buffer;
pub mod config;
pub mod directory;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod transport;

pub use buffer::{Message, MessageBuffer};
pub use config::Config;
pub use directory::{ChannelDirectory, NameResolver, Side};
pub use llm::{ChatModel, OpenRouterClient};
pub use pipeline::{CycleDriver, CycleOutcome};
pub use transport::{BotResolver, BotSink, DigestSink, UpdatesSource};
