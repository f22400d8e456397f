//! Cycle driver: the periodic scheduler that runs one digest cycle at
//! a time over the shared buffer.

use crate::buffer::MessageBuffer;
use crate::config::PipelineConfig;
use crate::directory::{ChannelDirectory, Side};
use crate::llm::ChatModel;
use crate::pipeline::assemble::{assemble_digest, TopicDigestBlock};
use crate::pipeline::cluster::{cluster_snapshot, IdMap};
use crate::pipeline::summarize::summarize_side;
use crate::pipeline::threshold::{apply_threshold, ValidatedTopic};
use crate::pipeline::unify::unify_topic;
use crate::pipeline::CycleResult;
use crate::transport::DigestSink;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// What one cycle did, for logging and tests.
#[derive(Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing buffered after eviction.
    EmptyBuffer,
    /// Clustering produced no topic that passed the threshold.
    NoValidTopics,
    /// Every surviving topic was one-sided, so nothing was delivered.
    NoTwoSidedTopics,
    /// A digest went out and its messages were removed.
    Delivered {
        topics: usize,
        messages_removed: usize,
    },
}

#[derive(Clone)]
pub struct CycleDriver {
    buffer: MessageBuffer,
    directory: Arc<ChannelDirectory>,
    model: Arc<dyn ChatModel>,
    sink: Arc<dyn DigestSink>,
    config: PipelineConfig,
}

impl CycleDriver {
    pub fn new(
        buffer: MessageBuffer,
        directory: Arc<ChannelDirectory>,
        model: Arc<dyn ChatModel>,
        sink: Arc<dyn DigestSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            buffer,
            directory,
            model,
            sink,
            config,
        }
    }

    /// Run forever: one startup delay, then one cycle per interval.
    ///
    /// Cycles never overlap; a slow cycle delays the next tick instead
    /// of queueing behind it. Each cycle runs in its own task so that
    /// a cycle-level panic is contained and the loop keeps ticking.
    pub async fn run(self) {
        info!(
            startup_delay_secs = self.config.startup_delay.as_secs(),
            interval_secs = self.config.cycle_interval.as_secs(),
            ttl_hours = self.config.message_ttl.num_hours(),
            threshold = self.config.topic_threshold,
            "Cycle driver started"
        );
        tokio::time::sleep(self.config.startup_delay).await;
        loop {
            tokio::time::sleep(self.config.cycle_interval).await;
            let cycle = self.clone();
            match tokio::spawn(async move { cycle.run_cycle().await }).await {
                Ok(Ok(outcome)) => info!(outcome = ?outcome, "Cycle finished"),
                Ok(Err(e)) => warn!(error = %e, "Cycle failed, buffer left untouched"),
                Err(e) => error!(error = %e, "Cycle task panicked, buffer left as-is"),
            }
        }
    }

    /// One full pass: evict, snapshot, cluster, filter, build blocks,
    /// deliver, then remove exactly the consumed messages.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> CycleResult<CycleOutcome> {
        let evicted = self.buffer.evict_expired(self.config.message_ttl);
        for (channel_id, count) in &evicted {
            info!(channel_id = %channel_id, count = *count, "Evicted expired messages");
        }
        self.warn_if_stale();

        let snapshot = self.buffer.snapshot();
        if snapshot.is_empty() {
            return Ok(CycleOutcome::EmptyBuffer);
        }
        info!(
            model = self.model.name(),
            messages = snapshot.len(),
            "Processing snapshot"
        );

        let clustered = cluster_snapshot(self.model.as_ref(), &snapshot).await;
        let validated = apply_threshold(clustered.topics, self.config.topic_threshold);
        if validated.is_empty() {
            return Ok(CycleOutcome::NoValidTopics);
        }

        let mut blocks = Vec::new();
        let mut consumed: HashSet<u64> = HashSet::new();
        for topic in &validated {
            match self.build_block(topic, &clustered.id_map).await {
                Some((block, message_ids)) => {
                    blocks.push(block);
                    consumed.extend(message_ids);
                }
                None => {
                    info!(
                        topic = %topic.group.title,
                        "Skipping one-sided topic, its messages stay buffered"
                    );
                }
            }
        }

        if blocks.is_empty() {
            return Ok(CycleOutcome::NoTwoSidedTopics);
        }

        let digest = assemble_digest(&blocks);
        self.sink.deliver(&digest).await?;
        info!(
            sink = self.sink.name(),
            topics = blocks.len(),
            bytes = digest.len(),
            "Digest delivered"
        );

        let messages_removed = self.buffer.remove_ids(&consumed);
        Ok(CycleOutcome::Delivered {
            topics: blocks.len(),
            messages_removed,
        })
    }

    /// Produce the digest block for one validated topic, or `None`
    /// when either side has no messages in it.
    async fn build_block(
        &self,
        topic: &ValidatedTopic,
        id_map: &IdMap,
    ) -> Option<(TopicDigestBlock, Vec<u64>)> {
        let members: HashSet<&str> = topic
            .group
            .items
            .iter()
            .map(|item| item.id.as_str())
            .collect();

        let mut left_texts = Vec::new();
        let mut right_texts = Vec::new();
        let mut message_ids = Vec::new();
        // walk the id map so side batches keep snapshot order
        for candidate in id_map.entries() {
            if !members.contains(candidate.ephemeral_id.as_str()) {
                continue;
            }
            match self.directory.side_of(&candidate.channel_id) {
                Some(Side::Left) => left_texts.push(candidate.text.as_str()),
                Some(Side::Right) => right_texts.push(candidate.text.as_str()),
                None => {
                    warn!(
                        channel_id = %candidate.channel_id,
                        topic = %topic.group.title,
                        "Clustered message has no side affiliation, leaving it out"
                    );
                    continue;
                }
            }
            message_ids.push(candidate.message_id);
        }

        if left_texts.is_empty() || right_texts.is_empty() {
            return None;
        }

        let title = &topic.group.title;
        let (left_summary, right_summary) = futures::future::join(
            summarize_side(self.model.as_ref(), title, &left_texts.join("\n")),
            summarize_side(self.model.as_ref(), title, &right_texts.join("\n")),
        )
        .await;

        let unified = unify_topic(self.model.as_ref(), title, &left_summary, &right_summary).await;

        Some((
            TopicDigestBlock {
                title: unified.title,
                description: unified.description,
                left_summary,
                right_summary,
            },
            message_ids,
        ))
    }

    /// Flag messages that keep surviving cycles and are close to
    /// expiring unprocessed.
    fn warn_if_stale(&self) {
        let Some((channel_id, age)) = self.buffer.oldest_age() else {
            return;
        };
        let ttl = self.config.message_ttl;
        if age >= ttl - ttl / 4 {
            warn!(
                channel_id = %channel_id,
                age_minutes = age.num_minutes(),
                ttl_minutes = ttl.num_minutes(),
                "Oldest buffered message is close to its TTL"
            );
        }
    }
}
