//! Ingestion path: filters raw transport messages down to monitored
//! channels and appends them to the shared buffer.

use crate::buffer::MessageBuffer;
use crate::directory::ChannelDirectory;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// One raw message handed over by the transport source.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub channel_id: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// Consume the source until it closes.
///
/// Runs concurrently with the cycle driver; the buffer handle keeps
/// interleaved appends safe.
pub async fn run(
    mut rx: mpsc::Receiver<Inbound>,
    buffer: MessageBuffer,
    directory: Arc<ChannelDirectory>,
) {
    while let Some(inbound) = rx.recv().await {
        if inbound.text.trim().is_empty() {
            continue;
        }
        if !directory.is_monitored(&inbound.channel_id) {
            debug!(
                channel_id = %inbound.channel_id,
                "Ignoring message from unmonitored channel"
            );
            continue;
        }
        if let Some(id) = buffer.append_at(&inbound.channel_id, &inbound.text, inbound.received_at)
        {
            debug!(
                message_id = id,
                channel_id = %inbound.channel_id,
                buffered = buffer.len(),
                "Buffered message"
            );
        }
    }
    info!("Ingestion source closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn directory() -> Arc<ChannelDirectory> {
        let mut left = HashSet::new();
        left.insert("-1001".to_string());
        let mut right = HashSet::new();
        right.insert("-2001".to_string());
        Arc::new(ChannelDirectory::from_sets(left, right))
    }

    fn inbound(channel_id: &str, text: &str) -> Inbound {
        Inbound {
            channel_id: channel_id.to_string(),
            text: text.to_string(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn monitored_messages_reach_the_buffer() {
        let buffer = MessageBuffer::new();
        let (tx, rx) = mpsc::channel(8);

        tx.send(inbound("-1001", "left says")).await.unwrap();
        tx.send(inbound("-2001", "right says")).await.unwrap();
        drop(tx);

        run(rx, buffer.clone(), directory()).await;

        let texts: Vec<String> = buffer.snapshot().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["left says".to_string(), "right says".to_string()]);
    }

    #[tokio::test]
    async fn unmonitored_and_blank_messages_are_dropped() {
        let buffer = MessageBuffer::new();
        let (tx, rx) = mpsc::channel(8);

        tx.send(inbound("-9999", "stranger")).await.unwrap();
        tx.send(inbound("-1001", "   ")).await.unwrap();
        tx.send(inbound("-1001", "kept")).await.unwrap();
        drop(tx);

        run(rx, buffer.clone(), directory()).await;

        let texts: Vec<String> = buffer.snapshot().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["kept".to_string()]);
    }
}
