//! Bounded, expiring in-memory store for channel messages.
//! Ingestion appends continuously; the cycle driver snapshots, evicts
//! by TTL, and removes messages consumed by a delivered digest.

pub mod message;
pub mod store;


pub use message::Message;
pub use store::MessageBuffer;
