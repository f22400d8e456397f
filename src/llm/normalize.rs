use crate::llm::LLMResult;
use serde_json::Value;
use tracing::warn;

/// Outcome of one model call after normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum LLMPayload {
    /// Response contained parseable JSON.
    Parsed(Value),
    /// Response was non-empty text that did not parse as JSON.
    Fallback(String),
    /// Call failed or produced nothing usable.
    Empty,
}

/// Collapse a model call outcome into a payload the pipeline stages
/// can match on.
///
/// Every stage that expects structured output routes its response
/// through here, so fence stripping and failure logging happen in one
/// place instead of per call site.
pub fn normalize_response(stage: &str, outcome: LLMResult<String>) -> LLMPayload {
    let raw = match outcome {
        Ok(raw) => raw,
        Err(e) => {
            let kind = if e.is_malformed() {
                "malformed"
            } else {
                "transport"
            };
            warn!(stage = stage, kind = kind, error = %e, "LLM call failed");
            return LLMPayload::Empty;
        }
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return LLMPayload::Empty;
    }

    match extract_json_fragment(trimmed) {
        Some(fragment) => match serde_json::from_str(&fragment) {
            Ok(value) => LLMPayload::Parsed(value),
            Err(_) => LLMPayload::Fallback(trimmed.to_string()),
        },
        None => LLMPayload::Fallback(trimmed.to_string()),
    }
}

/// Carve a JSON object out of a response that may wrap it in a
/// Markdown code fence or surrounding prose.
fn extract_json_fragment(trimmed: &str) -> Option<String> {
    // Look for JSON block markers
    if let Some(start) = trimmed.find("```json") {
        if let Some(end) = trimmed[start + 7..].find("```") {
            return Some(trimmed[start + 7..start + 7 + end].trim().to_string());
        }
    }

    // Look for raw JSON
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if end > start {
                return Some(trimmed[start..=end].to_string());
            }
        }
    }

    None
}
