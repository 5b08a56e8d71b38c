//! Per-frame transfer budget and resumable chunk streaming.

use tilestream_common::{ChunkPos, CHUNK_TILES};
use tracing::trace;

use crate::buffer::ViewBuffer;
use crate::source::TileSource;

/// Tile-write allowance for one frame.
///
/// Every tile written into the view buffer is debited here, whether it comes
/// from an immediate chunk load or a streaming step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferBudget {
    limit: u32,
    spent: u32,
}

impl TransferBudget {
    /// Creates a full budget of `limit` tiles.
    #[must_use]
    pub const fn new(limit: u32) -> Self {
        Self { limit, spent: 0 }
    }

    /// Refills the budget for a new frame.
    pub fn reset(&mut self) {
        self.spent = 0;
    }

    /// Tiles still available this frame.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.spent)
    }

    /// Tiles debited this frame.
    #[must_use]
    pub const fn spent(&self) -> u32 {
        self.spent
    }

    /// Per-frame limit.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Checks if nothing is left to spend.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Debits up to `tiles` and returns the amount granted.
    pub fn take(&mut self, tiles: u32) -> u32 {
        let granted = tiles.min(self.remaining());
        self.spent += granted;
        granted
    }
}

/// A chunk whose tiles are being written across several frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingSession {
    chunk: ChunkPos,
    progress: u32,
}

impl StreamingSession {
    /// Starts a session at the chunk's first tile.
    #[must_use]
    pub const fn new(chunk: ChunkPos) -> Self {
        Self { chunk, progress: 0 }
    }

    /// Chunk being streamed.
    #[must_use]
    pub const fn chunk(&self) -> ChunkPos {
        self.chunk
    }

    /// Tiles written so far (0 to `CHUNK_TILES`).
    #[must_use]
    pub const fn progress(&self) -> u32 {
        self.progress
    }

    /// Tiles still to write.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        CHUNK_TILES - self.progress
    }

    /// Checks if every tile has been written.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.progress >= CHUNK_TILES
    }

    /// Writes up to `max_tiles` further tiles in row-major order.
    ///
    /// Returns the number of tiles written.
    pub fn advance<S: TileSource + ?Sized>(
        &mut self,
        max_tiles: u32,
        source: &S,
        buffer: &mut ViewBuffer,
    ) -> u32 {
        let count = max_tiles.min(self.remaining());
        for _ in 0..count {
            let tile = self.chunk.tile_at(self.progress);
            buffer.write_tile(tile, source.cell_at(tile.x, tile.y));
            self.progress += 1;
        }
        trace!(
            "Streamed {} tiles of chunk {} ({}/{})",
            count,
            self.chunk,
            self.progress,
            CHUNK_TILES
        );
        count
    }
}
