//! Fixed toroidal view buffer and the display target it is flushed to.

use tilestream_common::{tile_to_buffer_coord, TilePos, VIEW_BUFFER_CELLS, VIEW_BUFFER_TILES};
use tracing::warn;

use crate::cell::MapCell;

/// The 128×128 tile window mirrored into display memory.
///
/// Addressing is toroidal: world tile `(x, y)` always lives at
/// `(x mod 128, y mod 128)`, so the fixed window can slide over a world of
/// any size.
pub struct ViewBuffer {
    cells: Box<[MapCell]>,
}

impl ViewBuffer {
    /// Creates a buffer filled with the empty sentinel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: vec![MapCell::EMPTY; VIEW_BUFFER_CELLS].into_boxed_slice(),
        }
    }

    /// Resets every cell to the empty sentinel.
    pub fn clear(&mut self) {
        self.cells.fill(MapCell::EMPTY);
    }

    /// Returns the flat index of a (wrapped) buffer tile coordinate.
    ///
    /// An index that still falls outside the buffer is logged and replaced
    /// by index 0.
    #[must_use]
    pub fn index(&self, buffer_x: i32, buffer_y: i32) -> usize {
        let wrapped_x = tile_to_buffer_coord(buffer_x);
        let wrapped_y = tile_to_buffer_coord(buffer_y);
        let index = (wrapped_y * VIEW_BUFFER_TILES + wrapped_x) as usize;
        if index >= self.cells.len() {
            warn!(
                "Buffer index {} out of range for tile ({}, {}), using slot 0",
                index, buffer_x, buffer_y
            );
            return 0;
        }
        index
    }

    /// Returns the cell at a buffer tile coordinate (wrapped).
    #[must_use]
    pub fn get(&self, buffer_x: i32, buffer_y: i32) -> MapCell {
        self.cells[self.index(buffer_x, buffer_y)]
    }

    /// Returns the cell that world tile `tile` maps to.
    #[must_use]
    pub fn cell_at_tile(&self, tile: TilePos) -> MapCell {
        self.get(tile.x, tile.y)
    }

    /// Writes a world tile into its wrapped position.
    pub fn write_tile(&mut self, tile: TilePos, cell: MapCell) {
        let index = self.index(tile.x, tile.y);
        self.cells[index] = cell;
    }

    /// Returns all cells, row-major.
    #[must_use]
    pub fn cells(&self) -> &[MapCell] {
        &self.cells
    }

    /// Returns the buffer as raw bytes for upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }

    /// Counts non-empty cells.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }
}

impl Default for ViewBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ViewBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewBuffer")
            .field("size", &VIEW_BUFFER_TILES)
            .field("occupied", &self.occupied_count())
            .finish()
    }
}

/// Display-side tile map that receives buffer flushes.
pub trait VramTarget {
    /// Replaces the hardware map contents with `bytes` (one byte per cell).
    fn upload(&mut self, bytes: &[u8]);
}

/// In-memory stand-in for a hardware tile map.
#[derive(Debug, Default, Clone)]
pub struct HostTileMap {
    cells: Vec<MapCell>,
    uploads: u64,
}

impl HostTileMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cells from the most recent upload.
    #[must_use]
    pub fn cells(&self) -> &[MapCell] {
        &self.cells
    }

    /// Returns the number of uploads received.
    #[must_use]
    pub const fn upload_count(&self) -> u64 {
        self.uploads
    }

    /// Returns the cell at a buffer tile coordinate, if the map holds one.
    #[must_use]
    pub fn get(&self, buffer_x: i32, buffer_y: i32) -> Option<MapCell> {
        if !(0..VIEW_BUFFER_TILES).contains(&buffer_x) || !(0..VIEW_BUFFER_TILES).contains(&buffer_y) {
            return None;
        }
        self.cells
            .get((buffer_y * VIEW_BUFFER_TILES + buffer_x) as usize)
            .copied()
    }
}

impl VramTarget for HostTileMap {
    fn upload(&mut self, bytes: &[u8]) {
        match bytemuck::try_cast_slice::<u8, MapCell>(bytes) {
            Ok(cells) => {
                self.cells.clear();
                self.cells.extend_from_slice(cells);
                self.uploads += 1;
            },
            Err(e) => warn!("Rejected tile map upload: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_empty() {
        let buffer = ViewBuffer::new();
        assert_eq!(buffer.cells().len(), VIEW_BUFFER_CELLS);
        assert_eq!(buffer.occupied_count(), 0);
    }

    #[test]
    fn test_write_wraps_toroidally() {
        let mut buffer = ViewBuffer::new();
        buffer.write_tile(TilePos::new(130, 257), MapCell::new(4));

        assert_eq!(buffer.get(2, 1), MapCell::new(4));
        assert_eq!(buffer.cell_at_tile(TilePos::new(2, 1)), MapCell::new(4));
        assert_eq!(buffer.cell_at_tile(TilePos::new(-126, -127)), MapCell::new(4));
        assert_eq!(buffer.occupied_count(), 1);
    }

    #[test]
    fn test_index_in_range() {
        let buffer = ViewBuffer::new();
        assert_eq!(buffer.index(0, 0), 0);
        assert_eq!(buffer.index(127, 127), VIEW_BUFFER_CELLS - 1);
        assert_eq!(buffer.index(-1, 0), 127);
        assert_eq!(buffer.index(i32::MIN, i32::MAX), buffer.index(0, 127));
    }

    #[test]
    fn test_clear() {
        let mut buffer = ViewBuffer::new();
        buffer.write_tile(TilePos::new(5, 5), MapCell::new(1));
        buffer.clear();
        assert_eq!(buffer.occupied_count(), 0);
    }

    #[test]
    fn test_host_map_upload() {
        let mut buffer = ViewBuffer::new();
        buffer.write_tile(TilePos::new(3, 4), MapCell::new(8));

        let mut map = HostTileMap::new();
        assert_eq!(map.get(3, 4), None);

        map.upload(buffer.as_bytes());
        assert_eq!(map.upload_count(), 1);
        assert_eq!(map.cells().len(), VIEW_BUFFER_CELLS);
        assert_eq!(map.get(3, 4), Some(MapCell::new(8)));
        assert_eq!(map.get(128, 0), None);
    }
}
