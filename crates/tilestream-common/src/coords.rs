//! Coordinate types for tile, chunk, and buffer-slot positions.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::layout::{CHUNK_SIZE_PIXELS, CHUNK_SIZE_TILES, VIEW_BUFFER_CHUNKS, VIEW_BUFFER_TILES};

/// Remainder of `value / modulus` folded into `[0, modulus)`.
///
/// Returns 0 for a zero modulus instead of panicking.
#[must_use]
pub const fn positive_mod(value: i32, modulus: i32) -> i32 {
    if modulus == 0 {
        return 0;
    }
    value.rem_euclid(modulus)
}

/// Maps a chunk coordinate (one axis) to its toroidal buffer slot.
#[must_use]
pub const fn chunk_to_buffer_slot(chunk_coord: i32) -> i32 {
    positive_mod(chunk_coord, VIEW_BUFFER_CHUNKS)
}

/// Maps a tile coordinate (one axis) to its wrapped buffer coordinate.
#[must_use]
pub const fn tile_to_buffer_coord(tile_coord: i32) -> i32 {
    positive_mod(tile_coord, VIEW_BUFFER_TILES)
}

/// Converts a world pixel coordinate (one axis) to a chunk coordinate.
#[must_use]
pub fn world_pixel_to_chunk(pixel: f32) -> i32 {
    (pixel / CHUNK_SIZE_PIXELS as f32).floor() as i32
}

/// Tile coordinate in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct TilePos {
    /// X coordinate in tiles
    pub x: i32,
    /// Y coordinate in tiles
    pub y: i32,
}

impl TilePos {
    /// Creates a new tile position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the chunk owning this tile.
    #[must_use]
    pub const fn to_chunk_pos(self) -> ChunkPos {
        ChunkPos {
            x: self.x.div_euclid(CHUNK_SIZE_TILES),
            y: self.y.div_euclid(CHUNK_SIZE_TILES),
        }
    }

    /// Returns the wrapped position of this tile inside the view buffer.
    #[must_use]
    pub const fn to_buffer_coord(self) -> (i32, i32) {
        (tile_to_buffer_coord(self.x), tile_to_buffer_coord(self.y))
    }
}

/// Chunk coordinate in world space.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable,
)]
#[repr(C)]
pub struct ChunkPos {
    /// X coordinate in chunks
    pub x: i32,
    /// Y coordinate in chunks
    pub y: i32,
}

impl ChunkPos {
    /// Creates a new chunk position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the chunk containing a world pixel position.
    #[must_use]
    pub fn from_world_pixels(pos: Vec2) -> Self {
        Self {
            x: world_pixel_to_chunk(pos.x),
            y: world_pixel_to_chunk(pos.y),
        }
    }

    /// Returns the top-left tile of this chunk.
    #[must_use]
    pub const fn origin_tile(self) -> TilePos {
        TilePos {
            x: self.x * CHUNK_SIZE_TILES,
            y: self.y * CHUNK_SIZE_TILES,
        }
    }

    /// Returns the tile at a row-major index inside this chunk.
    ///
    /// Indices past the chunk wrap onto following rows; callers keep
    /// `index < CHUNK_TILES`.
    #[must_use]
    pub const fn tile_at(self, index: u32) -> TilePos {
        let local_x = (index % CHUNK_SIZE_TILES as u32) as i32;
        let local_y = (index / CHUNK_SIZE_TILES as u32) as i32;
        let origin = self.origin_tile();
        TilePos {
            x: origin.x + local_x,
            y: origin.y + local_y,
        }
    }

    /// Returns the buffer slot this chunk maps to.
    #[must_use]
    pub const fn buffer_slot(self) -> BufferSlot {
        BufferSlot {
            x: chunk_to_buffer_slot(self.x),
            y: chunk_to_buffer_slot(self.y),
        }
    }

    /// Square-neighborhood distance: the larger of the per-axis distances.
    #[must_use]
    pub const fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy {
            dx
        } else {
            dy
        }
    }

    /// Clamps this position into `[0, width) × [0, height)` chunks.
    #[must_use]
    pub fn clamped(self, width_chunks: i32, height_chunks: i32) -> Self {
        Self {
            x: self.x.clamp(0, (width_chunks - 1).max(0)),
            y: self.y.clamp(0, (height_chunks - 1).max(0)),
        }
    }

    /// Returns true if this chunk lies inside `[0, width) × [0, height)`.
    #[must_use]
    pub const fn is_within(self, width_chunks: i32, height_chunks: i32) -> bool {
        self.x >= 0 && self.x < width_chunks && self.y >= 0 && self.y < height_chunks
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Chunk-sized cell of the toroidal view buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferSlot {
    /// Slot column (0 to `VIEW_BUFFER_CHUNKS - 1`)
    pub x: i32,
    /// Slot row (0 to `VIEW_BUFFER_CHUNKS - 1`)
    pub y: i32,
}

impl BufferSlot {
    /// Creates a new buffer slot.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns true if the slot lies inside the view buffer.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.x >= 0 && self.x < VIEW_BUFFER_CHUNKS && self.y >= 0 && self.y < VIEW_BUFFER_CHUNKS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_positive_mod() {
        assert_eq!(positive_mod(5, 16), 5);
        assert_eq!(positive_mod(16, 16), 0);
        assert_eq!(positive_mod(-1, 16), 15);
        assert_eq!(positive_mod(-17, 16), 15);
        assert_eq!(positive_mod(7, 0), 0);
    }

    #[test]
    fn test_tile_to_chunk() {
        assert_eq!(TilePos::new(0, 0).to_chunk_pos(), ChunkPos::new(0, 0));
        assert_eq!(TilePos::new(7, 8).to_chunk_pos(), ChunkPos::new(0, 1));
        assert_eq!(TilePos::new(512, 512).to_chunk_pos(), ChunkPos::new(64, 64));
        assert_eq!(TilePos::new(-1, -8).to_chunk_pos(), ChunkPos::new(-1, -1));
    }

    #[test]
    fn test_chunk_from_world_pixels() {
        assert_eq!(
            ChunkPos::from_world_pixels(Vec2::new(4096.0, 4096.0)),
            ChunkPos::new(64, 64)
        );
        assert_eq!(
            ChunkPos::from_world_pixels(Vec2::new(63.9, 64.0)),
            ChunkPos::new(0, 1)
        );
        assert_eq!(
            ChunkPos::from_world_pixels(Vec2::new(-0.5, 10.0)),
            ChunkPos::new(-1, 0)
        );
    }

    #[test]
    fn test_tile_at_row_major() {
        let chunk = ChunkPos::new(2, 3);
        assert_eq!(chunk.tile_at(0), TilePos::new(16, 24));
        assert_eq!(chunk.tile_at(7), TilePos::new(23, 24));
        assert_eq!(chunk.tile_at(8), TilePos::new(16, 25));
        assert_eq!(chunk.tile_at(63), TilePos::new(23, 31));
    }

    #[test]
    fn test_buffer_slot_wraps() {
        assert_eq!(ChunkPos::new(64, 65).buffer_slot(), BufferSlot::new(0, 1));
        assert_eq!(ChunkPos::new(15, 16).buffer_slot(), BufferSlot::new(15, 0));
        assert!(ChunkPos::new(-3, 127).buffer_slot().is_valid());
        assert!(!BufferSlot::new(16, 0).is_valid());
    }

    #[test]
    fn test_chebyshev_distance() {
        let center = ChunkPos::new(64, 64);
        assert_eq!(center.chebyshev_distance(center), 0);
        assert_eq!(center.chebyshev_distance(ChunkPos::new(68, 60)), 4);
        assert_eq!(center.chebyshev_distance(ChunkPos::new(60, 69)), 5);
    }

    #[test]
    fn test_clamped() {
        assert_eq!(ChunkPos::new(-5, 200).clamped(128, 128), ChunkPos::new(0, 127));
        assert_eq!(ChunkPos::new(10, 10).clamped(128, 128), ChunkPos::new(10, 10));
        assert!(ChunkPos::new(127, 0).is_within(128, 128));
        assert!(!ChunkPos::new(128, 0).is_within(128, 128));
    }

    proptest! {
        #[test]
        fn prop_slot_wraps_every_buffer_width(c in -100_000i32..100_000, k in -1000i32..1000) {
            prop_assert_eq!(
                chunk_to_buffer_slot(c),
                chunk_to_buffer_slot(c + k * VIEW_BUFFER_CHUNKS)
            );
        }

        #[test]
        fn prop_buffer_coord_in_range(t in proptest::num::i32::ANY) {
            let wrapped = tile_to_buffer_coord(t);
            prop_assert!((0..VIEW_BUFFER_TILES).contains(&wrapped));
        }
    }
}
