//! Digest assembly: fixed-format topic blocks joined into one
//! outbound body.

/// Finished per-topic block ready for assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDigestBlock {
    pub title: String,
    pub description: String,
    pub left_summary: String,
    pub right_summary: String,
}

/// Concatenate blocks in traversal order into the digest body.
pub fn assemble_digest(blocks: &[TopicDigestBlock]) -> String {
    let mut parts = Vec::with_capacity(blocks.len() * 3);
    for block in blocks {
        parts.push(format!("**{}**\n\n{}", block.title, block.description));
        parts.push(format!("**Left Perspective:**\n{}", block.left_summary));
        parts.push(format!("**Right Perspective:**\n{}", block.right_summary));
    }
    parts.join("\n\n")
}
