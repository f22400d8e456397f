//! Process configuration loaded from environment variables.
//! Missing or malformed values are fatal at startup; nothing here is
//! re-read once the pipeline is running.

use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for the language-model API used by clustering,
/// summarization, and unification.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl LlmConfig {
    /// Full URL of the chat completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

/// Settings for the message transport: monitored channel names per
/// side, the digest destination, and the bot credential.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub bot_token: String,
    pub left_channels: Vec<String>,
    pub right_channels: Vec<String>,
    pub target_channel: String,
    pub request_timeout: Duration,
}

/// Settings that shape the digest cycle itself.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub topic_threshold: usize,
    pub message_ttl: chrono::Duration,
    pub cycle_interval: Duration,
    pub startup_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub transport: TransportConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_env() -> ConfigResult<Self> {
        let api_base = optional("OPENROUTER_API_BASE", "https://openrouter.ai/v1");
        if let Err(e) = Url::parse(&api_base) {
            return Err(ConfigError::Invalid {
                key: "OPENROUTER_API_BASE".to_string(),
                reason: e.to_string(),
            });
        }

        let llm = LlmConfig {
            api_key: require("OPENROUTER_API_KEY")?,
            api_base,
            model: optional("OPENROUTER_MODEL", "deepseek/deepseek-chat:free"),
            request_timeout: Duration::from_secs(parse_positive("LLM_TIMEOUT_SECS", "30")?),
        };

        let transport = TransportConfig {
            bot_token: require("TELEGRAM_BOT_TOKEN")?,
            left_channels: parse_channel_list("LEFT_CHANNELS", &require("LEFT_CHANNELS")?)?,
            right_channels: parse_channel_list("RIGHT_CHANNELS", &require("RIGHT_CHANNELS")?)?,
            target_channel: require("TARGET_CHANNEL")?,
            request_timeout: Duration::from_secs(parse_positive("TRANSPORT_TIMEOUT_SECS", "30")?),
        };

        let pipeline = PipelineConfig {
            topic_threshold: parse_positive("TOPIC_THRESHOLD", "3")? as usize,
            message_ttl: chrono::Duration::hours(parse_positive("MESSAGE_TTL_HOURS", "12")? as i64),
            cycle_interval: Duration::from_secs(parse_positive("CYCLE_INTERVAL_SECS", "600")?),
            startup_delay: Duration::from_secs(parse_nonnegative("STARTUP_DELAY_SECS", "10")?),
        };

        Ok(Config {
            llm,
            transport,
            pipeline,
        })
    }
}

fn require(key: &str) -> ConfigResult<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing(key.to_string()))
}

fn optional(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_positive(key: &str, default: &str) -> ConfigResult<u64> {
    let value = parse_nonnegative_raw(key, &optional(key, default))?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

fn parse_nonnegative(key: &str, default: &str) -> ConfigResult<u64> {
    parse_nonnegative_raw(key, &optional(key, default))
}

fn parse_nonnegative_raw(key: &str, raw: &str) -> ConfigResult<u64> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        reason: format!("expected an integer, got {:?}", raw),
    })
}

/// Split a comma-separated list of channel names, dropping empty
/// entries left by stray commas.
fn parse_channel_list(key: &str, raw: &str) -> ConfigResult<Vec<String>> {
    let names: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        return Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: "no channel names configured".to_string(),
        });
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_list_parsing() {
        let names = parse_channel_list("LEFT_CHANNELS", "@alpha, @beta ,,@gamma").unwrap();
        assert_eq!(names, vec!["@alpha", "@beta", "@gamma"]);
    }

    #[test]
    fn test_channel_list_rejects_only_commas() {
        let err = parse_channel_list("RIGHT_CHANNELS", " , ,").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_completions_url_strips_trailing_slash() {
        let llm = LlmConfig {
            api_key: "k".to_string(),
            api_base: "https://openrouter.ai/v1/".to_string(),
            model: "m".to_string(),
            request_timeout: Duration::from_secs(30),
        };
        assert_eq!(llm.completions_url(), "https://openrouter.ai/v1/chat/completions");
    }

    #[test]
    fn test_integer_parsing_rejects_garbage() {
        let err = parse_nonnegative_raw("TOPIC_THRESHOLD", "three").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert_eq!(parse_nonnegative_raw("TOPIC_THRESHOLD", " 3 ").unwrap(), 3);
    }
}
