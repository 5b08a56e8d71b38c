//! # Tilestream World
//!
//! Chunk streaming for large tile worlds shown through a fixed display map.
//!
//! This crate handles:
//! - Tile sources (static arrays, procedural terrain, closures)
//! - The toroidal 128×128 view buffer and its upload target
//! - Chunk residency with bounded capacity and overflow eviction
//! - Budgeted, resumable chunk streaming
//! - World ↔ buffer coordinate transforms

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod buffer;
pub mod cell;
pub mod error;
pub mod residency;
pub mod session;
pub mod source;
pub mod streaming;
pub mod transform;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::buffer::*;
    pub use crate::cell::*;
    pub use crate::error::*;
    pub use crate::residency::*;
    pub use crate::session::*;
    pub use crate::source::*;
    pub use crate::streaming::*;
    pub use crate::transform::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_stream_and_commit() {
        let world = WorldMap::procedural(7, ProceduralParams::default()).expect("valid world");
        let mut manager = ChunkManager::new(StreamingConfig::default());
        manager.init(world).expect("init failed");
        let mut target = HostTileMap::new();

        let viewer = Vec2::new(2000.0, 3000.0);
        for _ in 0..12 {
            manager.update(viewer).expect("update failed");
            manager.commit_to_vram(&mut target).expect("commit failed");
        }

        assert_eq!(manager.loaded_count(), 81);
        assert_eq!(target.cells(), manager.view_buffer().cells());
    }

    #[test]
    fn test_stream_error_display() {
        assert_eq!(
            StreamError::Uninitialized.to_string(),
            "Chunk manager used before init()"
        );
    }
}
