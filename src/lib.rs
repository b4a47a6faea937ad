//! A persistent, crash-resilient, file-backed FIFO queue of opaque byte-string records.
//!
//! The queue lives in a single regular file and is designed so that any
//! single operation either completes and is durably visible, or leaves the
//! file in a state equivalent to the state before the operation began. See
//! [`queue::Queue`] for the public surface.

pub mod error;
pub mod queue;

pub use error::{QueueError, Result};
pub use queue::backend::{BlockIo, FaultInjector, FileBackend};
pub use queue::header::{HEADER_SIZE, MIN_FILE_SIZE};
pub use queue::Queue;
