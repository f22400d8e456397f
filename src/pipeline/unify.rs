//! Unification stage: merges two one-sided summaries into a balanced
//! title and description.

use crate::llm::{normalize_response, ChatModel, LLMPayload};
use tracing::warn;

pub const NO_DESCRIPTION: &str = "No description available";

/// Balanced title and description for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedTopic {
    pub title: String,
    pub description: String,
}

fn unify_prompt(topic: &str, left_summary: &str, right_summary: &str) -> String {
    format!(
        "Topic: {}\n\n\
         Left summary:\n{}\n\n\
         Right summary:\n{}\n\n\
         Create a balanced title and a neutral description for this topic.\n\
         Return JSON: {{ \"title\": \"...\", \"description\": \"...\" }}",
        topic, left_summary, right_summary
    )
}

/// Ask the model for a unified title and description, degrading
/// through the documented fallbacks instead of erroring.
pub async fn unify_topic(
    model: &dyn ChatModel,
    topic: &str,
    left_summary: &str,
    right_summary: &str,
) -> UnifiedTopic {
    let outcome = model
        .complete(&unify_prompt(topic, left_summary, right_summary))
        .await;
    resolve_unified(topic, normalize_response("unify", outcome))
}

/// Fallback ladder: parsed JSON with both string fields, then a
/// two-line raw response, then the topic title with a stock
/// description.
pub fn resolve_unified(topic: &str, payload: LLMPayload) -> UnifiedTopic {
    match payload {
        LLMPayload::Parsed(value) => {
            let title = value.get("title").and_then(|v| v.as_str());
            let description = value.get("description").and_then(|v| v.as_str());
            match (title, description) {
                (Some(title), Some(description)) => UnifiedTopic {
                    title: title.to_string(),
                    description: description.to_string(),
                },
                _ => {
                    warn!(topic = %topic, "Unification JSON lacks title or description");
                    UnifiedTopic {
                        title: topic.to_string(),
                        description: NO_DESCRIPTION.to_string(),
                    }
                }
            }
        }
        LLMPayload::Fallback(raw) => match raw.split_once('\n') {
            Some((first, rest)) => UnifiedTopic {
                title: first.trim().to_string(),
                description: rest.trim().to_string(),
            },
            None => UnifiedTopic {
                title: topic.to_string(),
                description: NO_DESCRIPTION.to_string(),
            },
        },
        LLMPayload::Empty => UnifiedTopic {
            title: topic.to_string(),
            description: NO_DESCRIPTION.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parsed_json_is_used_directly() {
        let unified = resolve_unified(
            "Raw Topic",
            LLMPayload::Parsed(json!({"title": "Balanced", "description": "Neutral"})),
        );
        assert_eq!(unified.title, "Balanced");
        assert_eq!(unified.description, "Neutral");
    }

    #[test]
    fn json_missing_description_falls_back_to_topic() {
        let unified = resolve_unified(
            "Raw Topic",
            LLMPayload::Parsed(json!({"title": "Only Title"})),
        );
        assert_eq!(unified.title, "Raw Topic");
        assert_eq!(unified.description, NO_DESCRIPTION);
    }

    #[test]
    fn non_string_fields_fall_back_to_topic() {
        let unified = resolve_unified(
            "Raw Topic",
            LLMPayload::Parsed(json!({"title": 5, "description": "Neutral"})),
        );
        assert_eq!(unified.title, "Raw Topic");
        assert_eq!(unified.description, NO_DESCRIPTION);
    }

    #[test]
    fn two_line_text_splits_into_title_and_description() {
        let unified = resolve_unified(
            "Raw Topic",
            LLMPayload::Fallback("A Fair Headline\nWith a longer body\nacross lines".to_string()),
        );
        assert_eq!(unified.title, "A Fair Headline");
        assert_eq!(unified.description, "With a longer body\nacross lines");
    }

    #[test]
    fn single_line_text_keeps_topic_title() {
        let unified = resolve_unified(
            "Raw Topic",
            LLMPayload::Fallback("no newline anywhere".to_string()),
        );
        assert_eq!(unified.title, "Raw Topic");
        assert_eq!(unified.description, NO_DESCRIPTION);
    }

    #[test]
    fn empty_payload_keeps_topic_title() {
        let unified = resolve_unified("Raw Topic", LLMPayload::Empty);
        assert_eq!(unified.title, "Raw Topic");
        assert_eq!(unified.description, NO_DESCRIPTION);
    }

    #[test]
    fn prompt_embeds_both_summaries() {
        let prompt = unify_prompt("Port Strike", "left view", "right view");
        assert!(prompt.starts_with("Topic: Port Strike\n\nLeft summary:\nleft view"));
        assert!(prompt.contains("Right summary:\nright view"));
        assert!(prompt.ends_with("Return JSON: { \"title\": \"...\", \"description\": \"...\" }"));
    }
}
