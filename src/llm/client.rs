use crate::config::LlmConfig;
use crate::llm::{ChatModel, LLMError, LLMResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 1000;

#[derive(Serialize, Debug)]
struct LLMRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Debug)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct LLMResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    content: String,
}

/// Chat-completion client for the OpenRouter API.
pub struct OpenRouterClient {
    http: Client,
    config: LlmConfig,
}

impl OpenRouterClient {
    pub fn new(config: LlmConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { http, config })
    }

    /// Makes the actual HTTP request to the LLM API.
    async fn dispatch(&self, request_body: &LLMRequest) -> LLMResult<String> {
        let response = self
            .http
            .post(self.config.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(request_body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status.as_u16(), body));
        }

        let parsed: LLMResponse = response
            .json()
            .await
            .map_err(|e| LLMError::Malformed(e.to_string()))?;

        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(LLMError::Empty);
        };
        if choice.message.content.trim().is_empty() {
            return Err(LLMError::Empty);
        }
        Ok(choice.message.content)
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenRouterClient {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn complete(&self, prompt: &str) -> LLMResult<String> {
        let request_body = LLMRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: None,
            temperature: Some(0.0),
        };

        for attempt in 1..=MAX_RETRIES {
            match self.dispatch(&request_body).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    if attempt == MAX_RETRIES {
                        return Err(e);
                    }
                    warn!(
                        attempt = attempt,
                        max_retries = MAX_RETRIES,
                        error = %e,
                        "LLM request failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64))
                        .await;
                }
            }
        }

        unreachable!("Should have returned or errored by now")
    }
}

fn classify_transport(e: reqwest::Error) -> LLMError {
    if e.is_timeout() {
        LLMError::Timeout
    } else if e.is_connect() {
        LLMError::Connect
    } else {
        LLMError::Network(e.to_string())
    }
}

fn classify_status(status: u16, body: String) -> LLMError {
    match status {
        401 => LLMError::Auth,
        403 => LLMError::Forbidden,
        429 => LLMError::RateLimited,
        500..=599 => LLMError::Server { status, body },
        _ => LLMError::Http { status, body },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(classify_status(401, String::new()), LLMError::Auth));
        assert!(matches!(
            classify_status(403, String::new()),
            LLMError::Forbidden
        ));
        assert!(matches!(
            classify_status(429, String::new()),
            LLMError::RateLimited
        ));
        assert!(matches!(
            classify_status(503, String::new()),
            LLMError::Server { status: 503, .. }
        ));
        assert!(matches!(
            classify_status(418, String::new()),
            LLMError::Http { status: 418, .. }
        ));
    }

    #[test]
    fn test_request_body_omits_unset_fields() {
        let request = LLMRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hello".to_string(),
            }],
            max_tokens: None,
            temperature: Some(0.0),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "test-model");
        assert_eq!(value["messages"][0]["role"], "user");
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["temperature"], 0.0);
    }

    #[test]
    fn test_response_content_extraction_shape() {
        let raw = r#"{"choices":[{"message":{"content":"summary text"}}]}"#;
        let parsed: LLMResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "summary text");
    }
}
