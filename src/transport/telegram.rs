use crate::config::TransportConfig;
use crate::directory::NameResolver;
use crate::ingest::Inbound;
use crate::transport::{DigestSink, SinkError, SinkResult};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

const BOT_API_BASE: &str = "https://api.telegram.org";
const POLL_TIMEOUT_SECS: u64 = 25;
const POLL_RETRY_DELAY_SECS: u64 = 5;

fn method_url(token: &str, method: &str) -> String {
    format!("{}/bot{}/{}", BOT_API_BASE, token, method)
}

/// Sends the assembled digest to the target chat via `sendMessage`.
pub struct BotSink {
    http: Client,
    token: String,
    target_chat: String,
}

impl BotSink {
    pub fn new(config: &TransportConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            token: config.bot_token.clone(),
            target_chat: config.target_channel.clone(),
        })
    }
}

#[async_trait::async_trait]
impl DigestSink for BotSink {
    fn name(&self) -> &'static str {
        "telegram-bot"
    }

    async fn deliver(&self, body: &str) -> SinkResult<()> {
        let response = self
            .http
            .get(method_url(&self.token, "sendMessage"))
            .query(&[("chat_id", self.target_chat.as_str()), ("text", body)])
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

fn classify_transport(e: reqwest::Error) -> SinkError {
    if e.is_timeout() {
        SinkError::Timeout
    } else if e.is_connect() {
        SinkError::Connect
    } else {
        SinkError::Network(e.to_string())
    }
}

/// Resolves channel usernames to numeric chat ids via `getChat`.
pub struct BotResolver {
    http: Client,
    token: String,
}

#[derive(Deserialize, Debug)]
struct GetChatResponse {
    ok: bool,
    result: Option<ChatInfo>,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChatInfo {
    id: i64,
}

impl BotResolver {
    pub fn new(config: &TransportConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            token: config.bot_token.clone(),
        })
    }
}

#[async_trait::async_trait]
impl NameResolver for BotResolver {
    fn name(&self) -> &'static str {
        "telegram-getchat"
    }

    async fn resolve(&self, channel_name: &str) -> anyhow::Result<String> {
        let response = self
            .http
            .get(method_url(&self.token, "getChat"))
            .query(&[("chat_id", channel_name)])
            .send()
            .await?
            .error_for_status()?;

        let parsed: GetChatResponse = response.json().await?;
        if !parsed.ok {
            anyhow::bail!(
                "getChat rejected: {}",
                parsed
                    .description
                    .unwrap_or_else(|| "no description".to_string())
            );
        }
        let Some(chat) = parsed.result else {
            anyhow::bail!("getChat returned ok without a chat object");
        };
        Ok(chat.id.to_string())
    }
}

/// Long-polls `getUpdates` and forwards channel posts to the
/// ingestion path.
pub struct UpdatesSource {
    http: Client,
    token: String,
}

#[derive(Deserialize, Debug)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Deserialize, Debug)]
struct Update {
    update_id: i64,
    channel_post: Option<IncomingMessage>,
    message: Option<IncomingMessage>,
}

#[derive(Deserialize, Debug)]
struct IncomingMessage {
    date: i64,
    text: Option<String>,
    chat: Chat,
}

#[derive(Deserialize, Debug)]
struct Chat {
    id: i64,
}

impl UpdatesSource {
    pub fn new(config: &TransportConfig) -> anyhow::Result<Self> {
        // client timeout must outlast the long-poll window
        let http = Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .build()?;
        Ok(Self {
            http,
            token: config.bot_token.clone(),
        })
    }

    /// Poll until the receiving side hangs up.
    pub async fn run(self, tx: mpsc::Sender<Inbound>) {
        let mut offset: Option<i64> = None;
        loop {
            match self.poll(offset).await {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        let Some(message) = update.channel_post.or(update.message) else {
                            continue;
                        };
                        let Some(inbound) = into_inbound(message) else {
                            continue;
                        };
                        if tx.send(inbound).await.is_err() {
                            info!("Ingestion channel closed, stopping update polling");
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "getUpdates poll failed, backing off");
                    tokio::time::sleep(Duration::from_secs(POLL_RETRY_DELAY_SECS)).await;
                }
            }
        }
    }

    async fn poll(&self, offset: Option<i64>) -> anyhow::Result<Vec<Update>> {
        let mut request = self
            .http
            .get(method_url(&self.token, "getUpdates"))
            .query(&[("timeout", POLL_TIMEOUT_SECS.to_string())]);
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset.to_string())]);
        }

        let response = request.send().await?.error_for_status()?;
        let parsed: UpdatesResponse = response.json().await?;
        if !parsed.ok {
            anyhow::bail!("getUpdates returned ok=false");
        }
        Ok(parsed.result)
    }
}

fn into_inbound(message: IncomingMessage) -> Option<Inbound> {
    let text = message.text?;
    let received_at = DateTime::from_timestamp(message.date, 0).unwrap_or_else(Utc::now);
    Some(Inbound {
        channel_id: message.chat.id.to_string(),
        text,
        received_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url_format() {
        assert_eq!(
            method_url("123:abc", "sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_update_deserialization_channel_post() {
        let raw = r#"{
            "ok": true,
            "result": [
                {
                    "update_id": 42,
                    "channel_post": {
                        "date": 1700000000,
                        "text": "breaking news",
                        "chat": {"id": -1001}
                    }
                }
            ]
        }"#;
        let parsed: UpdatesResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.ok);
        assert_eq!(parsed.result.len(), 1);
        assert_eq!(parsed.result[0].update_id, 42);
        let post = parsed.result[0].channel_post.as_ref().unwrap();
        assert_eq!(post.chat.id, -1001);
        assert_eq!(post.text.as_deref(), Some("breaking news"));
    }

    #[test]
    fn test_textless_update_is_dropped() {
        let message = IncomingMessage {
            date: 1700000000,
            text: None,
            chat: Chat { id: -1001 },
        };
        assert!(into_inbound(message).is_none());
    }

    #[test]
    fn test_inbound_conversion() {
        let message = IncomingMessage {
            date: 1700000000,
            text: Some("breaking news".to_string()),
            chat: Chat { id: -1001 },
        };
        let inbound = into_inbound(message).unwrap();
        assert_eq!(inbound.channel_id, "-1001");
        assert_eq!(inbound.text, "breaking news");
        assert_eq!(inbound.received_at.timestamp(), 1700000000);
    }
}
