//! Summarization stage: one model call per side of a topic.

use crate::llm::ChatModel;
use tracing::warn;

fn summarize_prompt(topic: &str, text: &str) -> String {
    format!(
        "Summarize the following messages under topic '{}':\n{}",
        topic, text
    )
}

/// Summarize one side's newline-joined message batch.
///
/// Empty input returns an empty summary without a model call; a failed
/// or blank response degrades to an empty summary. Callers treat an
/// empty string as "no content for this side".
pub async fn summarize_side(model: &dyn ChatModel, topic: &str, text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    match model.complete(&summarize_prompt(topic, text)).await {
        Ok(summary) if !summary.trim().is_empty() => summary,
        Ok(_) => String::new(),
        Err(e) => {
            warn!(topic = %topic, error = %e, "Summarization failed, side left empty");
            String::new()
        }
    }
}
