//! Clustering stage: one model call turns the snapshot into candidate
//! topic groups keyed by cycle-scoped ephemeral ids.

use crate::buffer::Message;
use crate::llm::{normalize_response, ChatModel, LLMPayload};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// A snapshot entry annotated with its cycle-scoped ephemeral id.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub ephemeral_id: String,
    pub message_id: u64,
    pub channel_id: String,
    pub text: String,
}

/// Correlates clustering output back to the buffered messages.
///
/// Built fresh each cycle and discarded with it; entries keep
/// snapshot order.
#[derive(Debug, Default)]
pub struct IdMap {
    entries: Vec<Candidate>,
    index: HashMap<String, usize>,
}

impl IdMap {
    fn push(&mut self, candidate: Candidate) {
        self.index
            .insert(candidate.ephemeral_id.clone(), self.entries.len());
        self.entries.push(candidate);
    }

    pub fn get(&self, ephemeral_id: &str) -> Option<&Candidate> {
        self.index.get(ephemeral_id).map(|&i| &self.entries[i])
    }

    /// All candidates in snapshot order.
    pub fn entries(&self) -> &[Candidate] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One `{id, channel}` reference in a clustering response.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClusterCandidate {
    pub id: String,
    pub channel: String,
}

/// A titled group of candidate references, in response order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicGroup {
    pub title: String,
    pub items: Vec<ClusterCandidate>,
}

/// What the clustering stage hands back to the driver.
///
/// `topics` is empty on any soft failure; the id map survives either
/// way so the cycle can still account for its snapshot.
#[derive(Debug, Default)]
pub struct ClusterOutcome {
    pub topics: Vec<TopicGroup>,
    pub id_map: IdMap,
}

fn cluster_prompt(annotated: &str) -> String {
    format!(
        "Group these annotated messages into clusters describing the same event or topic.\n\
         Return JSON: keys = cluster titles (3–5 words),\n\
         values = lists of objects {{ \"id\": \"<UUID>\", \"channel\": \"<channel_id>\" }}.\n\n\
         Messages:\n{}",
        annotated
    )
}

/// Tag every snapshot message with a fresh ephemeral id and ask the
/// model to group them into topics.
pub async fn cluster_snapshot(model: &dyn ChatModel, snapshot: &[Message]) -> ClusterOutcome {
    let mut id_map = IdMap::default();
    let mut lines = Vec::with_capacity(snapshot.len());
    for message in snapshot {
        let candidate = Candidate {
            ephemeral_id: Uuid::new_v4().to_string(),
            message_id: message.id,
            channel_id: message.channel_id.clone(),
            text: message.text.clone(),
        };
        // one line per message, newlines flattened
        lines.push(format!(
            "id: {} | channel: {} | {}",
            candidate.ephemeral_id,
            candidate.channel_id,
            candidate.text.replace('\n', " ")
        ));
        id_map.push(candidate);
    }

    if id_map.is_empty() {
        return ClusterOutcome::default();
    }
    debug!(candidates = id_map.len(), "Built cycle id map");

    let prompt = cluster_prompt(&lines.join("\n"));
    let payload = normalize_response("cluster", model.complete(&prompt).await);

    match parse_topics(&payload, &id_map) {
        Ok(topics) => ClusterOutcome { topics, id_map },
        Err(reason) => {
            warn!(reason = %reason, "Discarding clustering response");
            ClusterOutcome {
                topics: Vec::new(),
                id_map,
            }
        }
    }
}

/// Validate a clustering payload against the cycle's id map.
///
/// The whole response is rejected on the first malformed group: a
/// digest built from a half-understood clustering is worse than
/// retrying the batch next cycle.
fn parse_topics(payload: &LLMPayload, id_map: &IdMap) -> Result<Vec<TopicGroup>, String> {
    let value = match payload {
        LLMPayload::Parsed(value) => value,
        LLMPayload::Fallback(_) => return Err("response is not JSON".to_string()),
        LLMPayload::Empty => return Err("no usable response".to_string()),
    };

    let Some(object) = value.as_object() else {
        return Err("response is not a JSON object".to_string());
    };

    let mut topics = Vec::with_capacity(object.len());
    for (title, entries) in object {
        if title.trim().is_empty() {
            return Err("empty topic title".to_string());
        }
        if title.contains('"') {
            return Err(format!("topic title contains a double quote: {}", title));
        }
        let Some(array) = entries.as_array() else {
            return Err(format!("topic {:?} does not map to an array", title));
        };

        let mut items = Vec::with_capacity(array.len());
        for entry in array {
            let item: ClusterCandidate = serde_json::from_value(entry.clone())
                .map_err(|e| format!("bad cluster entry under {:?}: {}", title, e))?;
            let Some(known) = id_map.get(&item.id) else {
                return Err(format!("unknown ephemeral id {:?} under {:?}", item.id, title));
            };
            if known.channel_id != item.channel {
                return Err(format!(
                    "channel mismatch for id {:?}: expected {}, got {}",
                    item.id, known.channel_id, item.channel
                ));
            }
            items.push(item);
        }
        topics.push(TopicGroup {
            title: title.clone(),
            items,
        });
    }
    Ok(topics)
}
