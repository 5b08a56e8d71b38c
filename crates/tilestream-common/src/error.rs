//! Error types shared across Tilestream crates.

use thiserror::Error;

/// World and tile-source errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// Tile data does not describe a valid world
    #[error("Invalid world data: {0}")]
    InvalidData(String),
}

/// Result type alias for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
