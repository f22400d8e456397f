//! Service entry point: load configuration, resolve the channel
//! directory, then run the ingestion path and the cycle driver side
//! by side until the process is stopped.

use anyhow::Context;
use janus::config::Config;
use janus::directory::ChannelDirectory;
use janus::ingest;
use janus::llm::{ChatModel, OpenRouterClient};
use janus::pipeline::CycleDriver;
use janus::transport::{BotResolver, BotSink, DigestSink, UpdatesSource};
use janus::MessageBuffer;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        model = %config.llm.model,
        target = %config.transport.target_channel,
        left_names = config.transport.left_channels.len(),
        right_names = config.transport.right_channels.len(),
        "Configuration loaded"
    );

    let resolver = BotResolver::new(&config.transport)?;
    let directory = Arc::new(
        ChannelDirectory::populate(
            &resolver,
            &config.transport.left_channels,
            &config.transport.right_channels,
        )
        .await,
    );
    if directory.is_empty() {
        anyhow::bail!("no monitored channel resolved; nothing to digest");
    }
    if directory.left_count() == 0 || directory.right_count() == 0 {
        tracing::warn!(
            left = directory.left_count(),
            right = directory.right_count(),
            "One side has no resolved channels; every topic will be one-sided"
        );
    }

    let buffer = MessageBuffer::new();
    let model: Arc<dyn ChatModel> = Arc::new(OpenRouterClient::new(config.llm.clone())?);
    let sink: Arc<dyn DigestSink> = Arc::new(BotSink::new(&config.transport)?);
    let source = UpdatesSource::new(&config.transport)?;

    let (tx, rx) = mpsc::channel(1024);
    tokio::spawn(source.run(tx));
    tokio::spawn(ingest::run(rx, buffer.clone(), directory.clone()));

    CycleDriver::new(buffer, directory, model, sink, config.pipeline.clone())
        .run()
        .await;

    Ok(())
}
