//! Streaming errors.

use thiserror::Error;
use tilestream_common::WorldError;

/// Chunk streaming errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    /// `update`/`commit_to_vram` called before `init`
    #[error("Chunk manager used before init()")]
    Uninitialized,

    /// Residency bookkeeping broke one of its invariants
    #[error("Residency invariant violated: {0}")]
    InvariantViolation(String),

    /// Tile source rejected its data
    #[error("World error: {0}")]
    World(#[from] WorldError),
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
