//! The digest pipeline: cluster → filter → summarize → unify →
//! assemble, driven once per interval over the shared buffer.

pub mod assemble;
pub mod cluster;
pub mod driver;
pub mod summarize;
pub mod threshold;
pub mod unify;


pub use driver::{CycleDriver, CycleOutcome};

use crate::transport::SinkError;
use thiserror::Error;

/// The only hard failure a cycle can report. Everything upstream of
/// delivery degrades in place instead of erroring.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Digest delivery failed: {0}")]
    Delivery(#[from] SinkError),
}

pub type CycleResult<T> = std::result::Result<T, CycleError>;
