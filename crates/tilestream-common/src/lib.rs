//! # Tilestream Common
//!
//! Shared vocabulary for the Tilestream chunk-streaming engine.
//!
//! This crate provides the types every other crate agrees on:
//! - Layout constants (tile, chunk, view buffer and world sizes)
//! - Coordinate types (tile, chunk, buffer slot)
//! - Toroidal addressing helpers
//! - Common error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod layout;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::layout::*;
}

pub use prelude::*;
