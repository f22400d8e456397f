use chrono::{DateTime, Utc};

/// A single buffered channel message awaiting the next digest cycle.
///
/// The `id` is assigned once at append time and never reused for the
/// lifetime of the buffer, so later pipeline stages can refer back to
/// exactly this message even when another channel carries identical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub channel_id: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl Message {
    /// Age of the message relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.received_at
    }
}
