//! Threshold filter: keeps only topics corroborated by enough
//! distinct channels.

use crate::pipeline::cluster::TopicGroup;
use std::collections::HashSet;
use tracing::debug;

/// A topic group that passed the corroboration bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTopic {
    pub group: TopicGroup,
    pub distinct_channels: usize,
}

/// Retain groups referencing at least `threshold` distinct channels,
/// preserving their order. The comparison is inclusive.
pub fn apply_threshold(groups: Vec<TopicGroup>, threshold: usize) -> Vec<ValidatedTopic> {
    groups
        .into_iter()
        .filter_map(|group| {
            let distinct: HashSet<&str> =
                group.items.iter().map(|item| item.channel.as_str()).collect();
            let distinct_channels = distinct.len();
            if distinct_channels >= threshold {
                Some(ValidatedTopic {
                    group,
                    distinct_channels,
                })
            } else {
                debug!(
                    topic = %group.title,
                    distinct_channels = distinct_channels,
                    threshold = threshold,
                    "Dropping under-corroborated topic"
                );
                None
            }
        })
        .collect()
}
