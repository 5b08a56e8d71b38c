//! Map cell stored in the view buffer and uploaded to the display.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// One affine background map cell: an opaque 8-bit tile index.
///
/// The layout is a single byte so the whole view buffer can be handed to
/// the display hardware as a raw byte slice.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable,
)]
#[repr(transparent)]
pub struct MapCell(pub u8);

impl MapCell {
    /// Sentinel for "no tile"; also returned for coordinates outside the world.
    pub const EMPTY: Self = Self(0);

    /// Creates a cell referencing the given tile index.
    #[must_use]
    pub const fn new(tile_index: u8) -> Self {
        Self(tile_index)
    }

    /// Returns the tile index.
    #[must_use]
    pub const fn tile_index(self) -> u8 {
        self.0
    }

    /// Checks if this is the empty sentinel.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<u8> for MapCell {
    fn from(tile_index: u8) -> Self {
        Self(tile_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_size() {
        assert_eq!(std::mem::size_of::<MapCell>(), 1);
    }

    #[test]
    fn test_cell_default_is_empty() {
        assert_eq!(MapCell::default(), MapCell::EMPTY);
        assert!(MapCell::default().is_empty());
        assert!(!MapCell::new(7).is_empty());
        assert_eq!(MapCell::from(7).tile_index(), 7);
    }

    #[test]
    fn test_cells_cast_to_bytes() {
        let cells = [MapCell::new(1), MapCell::EMPTY, MapCell::new(255)];
        let bytes: &[u8] = bytemuck::cast_slice(&cells);
        assert_eq!(bytes, &[1, 0, 255]);
    }
}
