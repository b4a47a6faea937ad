//! Error taxonomy for the ring queue.
//!
//! Mirrors the failure model the engine is built around: an `Io` failure
//! before a header commit is absorbed by callers into a boolean `false`,
//! while `CorruptHeader`, `CapacityExceeded`, and `InvalidArgument` describe
//! conditions retrying won't fix and are always surfaced as errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    #[error("required file size exceeds the maximum representable header value")]
    CapacityExceeded,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;
