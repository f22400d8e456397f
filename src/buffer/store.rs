use crate::buffer::message::Message;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

/// Public handle to the message buffer.
///
/// Cloning is cheap; all clones share one guarded store, so the
/// ingestion path and the cycle driver can hold their own handles.
#[derive(Clone)]
pub struct MessageBuffer {
    inner: Arc<Mutex<BufferInner>>,
}

struct BufferInner {
    channels: BTreeMap<String, Vec<Message>>, // channel_id -> insertion-ordered messages
    next_id: u64,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BufferInner {
                channels: BTreeMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Record a message with the current timestamp.
    ///
    /// Returns the assigned message id, or `None` when the text is blank
    /// and nothing was stored.
    pub fn append(&self, channel_id: &str, text: &str) -> Option<u64> {
        self.append_at(channel_id, text, Utc::now())
    }

    /// Record a message with an explicit receive timestamp.
    pub fn append_at(&self, channel_id: &str, text: &str, received_at: DateTime<Utc>) -> Option<u64> {
        if text.trim().is_empty() {
            return None;
        }
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .channels
            .entry(channel_id.to_string())
            .or_default()
            .push(Message {
                id,
                channel_id: channel_id.to_string(),
                text: text.to_string(),
                received_at,
            });
        Some(id)
    }

    /// Drop every message whose age is at least `ttl`.
    ///
    /// Returns the number of messages removed per channel; channels that
    /// lost nothing are absent from the map.
    pub fn evict_expired(&self, ttl: Duration) -> BTreeMap<String, usize> {
        let now = Utc::now();
        let mut removed = BTreeMap::new();
        let mut inner = self.inner.lock().unwrap();
        for (channel_id, messages) in inner.channels.iter_mut() {
            let before = messages.len();
            messages.retain(|m| m.age(now) < ttl);
            let dropped = before - messages.len();
            if dropped > 0 {
                removed.insert(channel_id.clone(), dropped);
            }
        }
        inner.channels.retain(|_, messages| !messages.is_empty());
        removed
    }

    /// Copy out the current contents as one flat sequence.
    ///
    /// Ordering is stable: channels in lexicographic order, messages in
    /// insertion order within each channel.
    pub fn snapshot(&self) -> Vec<Message> {
        let inner = self.inner.lock().unwrap();
        inner
            .channels
            .values()
            .flat_map(|messages| messages.iter().cloned())
            .collect()
    }

    /// Remove every message whose text is a member of `texts`.
    ///
    /// Matches by text equality across all channels, so unrelated
    /// duplicates of a consumed text are removed too. Returns the total
    /// number of messages removed.
    pub fn remove_matching(&self, texts: &HashSet<String>) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let mut removed = 0;
        for messages in inner.channels.values_mut() {
            let before = messages.len();
            messages.retain(|m| !texts.contains(&m.text));
            removed += before - messages.len();
        }
        inner.channels.retain(|_, messages| !messages.is_empty());
        removed
    }

    /// Remove exactly the messages whose ids are in `ids`.
    ///
    /// Returns the total number of messages removed.
    pub fn remove_ids(&self, ids: &HashSet<u64>) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let mut removed = 0;
        for messages in inner.channels.values_mut() {
            let before = messages.len();
            messages.retain(|m| !ids.contains(&m.id));
            removed += before - messages.len();
        }
        inner.channels.retain(|_, messages| !messages.is_empty());
        removed
    }

    /// Channel and age of the oldest buffered message, if any.
    pub fn oldest_age(&self) -> Option<(String, Duration)> {
        let now = Utc::now();
        let inner = self.inner.lock().unwrap();
        inner
            .channels
            .values()
            .flatten()
            .min_by_key(|m| m.received_at)
            .map(|m| (m.channel_id.clone(), m.age(now)))
    }

    /// Total number of buffered messages across all channels.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.channels.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}
