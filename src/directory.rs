//! Channel directory: resolves configured channel names once at
//! startup and answers side-affiliation lookups for the pipeline.

use std::collections::HashSet;
use tracing::{info, warn};

/// Which side of the monitored divide a channel belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn label(&self) -> &'static str {
        match self {
            Side::Left => "Left",
            Side::Right => "Right",
        }
    }
}

/// Resolves a human-readable channel name to its internal id.
#[async_trait::async_trait]
pub trait NameResolver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, channel_name: &str) -> anyhow::Result<String>;
}

/// Static map from resolved channel id to side affiliation.
///
/// Built once before the first cycle; never mutated afterwards.
pub struct ChannelDirectory {
    left: HashSet<String>,
    right: HashSet<String>,
}

impl ChannelDirectory {
    /// Resolve each configured name through `resolver` and register it
    /// under its side. A name that fails to resolve is logged and
    /// dropped from monitoring rather than failing the whole startup.
    pub async fn populate(
        resolver: &dyn NameResolver,
        left_names: &[String],
        right_names: &[String],
    ) -> Self {
        let left = resolve_all(resolver, left_names, Side::Left).await;
        let right = resolve_all(resolver, right_names, Side::Right).await;
        Self { left, right }
    }

    /// Build directly from already-resolved ids.
    pub fn from_sets(left: HashSet<String>, right: HashSet<String>) -> Self {
        Self { left, right }
    }

    pub fn side_of(&self, channel_id: &str) -> Option<Side> {
        if self.left.contains(channel_id) {
            Some(Side::Left)
        } else if self.right.contains(channel_id) {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub fn is_monitored(&self, channel_id: &str) -> bool {
        self.side_of(channel_id).is_some()
    }

    /// True when no channel resolved on either side.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }

    pub fn left_count(&self) -> usize {
        self.left.len()
    }

    pub fn right_count(&self) -> usize {
        self.right.len()
    }
}

async fn resolve_all(
    resolver: &dyn NameResolver,
    names: &[String],
    side: Side,
) -> HashSet<String> {
    let mut resolved = HashSet::new();
    for name in names {
        match resolver.resolve(name).await {
            Ok(channel_id) => {
                info!(
                    resolver = resolver.name(),
                    name = %name,
                    channel_id = %channel_id,
                    side = side.label(),
                    "Resolved channel"
                );
                resolved.insert(channel_id);
            }
            Err(e) => {
                warn!(
                    resolver = resolver.name(),
                    name = %name,
                    side = side.label(),
                    error = %e,
                    "Failed to resolve channel name, excluding it from monitoring"
                );
            }
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct StubResolver;

    #[async_trait::async_trait]
    impl NameResolver for StubResolver {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn resolve(&self, channel_name: &str) -> anyhow::Result<String> {
            match channel_name {
                "@alpha" => Ok("-1001".to_string()),
                "@beta" => Ok("-1002".to_string()),
                "@gamma" => Ok("-1003".to_string()),
                other => Err(anyhow!("unknown channel: {}", other)),
            }
        }
    }

    #[tokio::test]
    async fn populate_registers_resolved_sides() {
        let directory = ChannelDirectory::populate(
            &StubResolver,
            &["@alpha".to_string(), "@beta".to_string()],
            &["@gamma".to_string()],
        )
        .await;

        assert_eq!(directory.side_of("-1001"), Some(Side::Left));
        assert_eq!(directory.side_of("-1002"), Some(Side::Left));
        assert_eq!(directory.side_of("-1003"), Some(Side::Right));
        assert_eq!(directory.side_of("-9999"), None);
        assert_eq!(directory.left_count(), 2);
        assert_eq!(directory.right_count(), 1);
    }

    #[tokio::test]
    async fn unresolvable_names_are_skipped() {
        let directory = ChannelDirectory::populate(
            &StubResolver,
            &["@alpha".to_string(), "@missing".to_string()],
            &["@also-missing".to_string()],
        )
        .await;

        assert_eq!(directory.left_count(), 1);
        assert_eq!(directory.right_count(), 0);
        assert!(!directory.is_empty());
    }

    #[tokio::test]
    async fn all_failures_leave_directory_empty() {
        let directory =
            ChannelDirectory::populate(&StubResolver, &["@missing".to_string()], &[]).await;
        assert!(directory.is_empty());
    }

    #[test]
    fn monitored_lookup_covers_both_sides() {
        let mut left = HashSet::new();
        left.insert("-1".to_string());
        let mut right = HashSet::new();
        right.insert("-2".to_string());
        let directory = ChannelDirectory::from_sets(left, right);

        assert!(directory.is_monitored("-1"));
        assert!(directory.is_monitored("-2"));
        assert!(!directory.is_monitored("-3"));
    }
}
