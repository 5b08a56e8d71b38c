//! Chunk streaming through the toroidal view buffer.
//!
//! [`ChunkManager`] keeps the square neighborhood of the viewer's chunk
//! resident in the 16×16-chunk view buffer. Each frame it evicts chunks that
//! left the neighborhood, then writes missing chunks nearest-first until the
//! frame's tile budget runs out. A chunk that does not fit in what is left of
//! the budget is streamed over the following frames.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tilestream_common::{
    ChunkPos, TilePos, WorldError, CHUNK_SIZE_TILES, CHUNK_TILES, LOAD_RANGE, MAX_CHUNKS_PER_FRAME,
    TILES_PER_FRAME, VIEW_BUFFER_CHUNKS,
};
use tracing::{debug, info};

use crate::buffer::{ViewBuffer, VramTarget};
use crate::cell::MapCell;
use crate::error::{StreamError, StreamResult};
use crate::residency::{ChunkState, EvictionPolicy, LoadedChunk, ResidencyTable};
use crate::session::{StreamingSession, TransferBudget};
use crate::source::{TileSource, WorldMap};
use crate::transform;

/// Largest load range whose neighborhood fits the buffer without aliasing.
pub const MAX_LOAD_RANGE: i32 = (VIEW_BUFFER_CHUNKS - 1) / 2;

const SLOTS: usize = VIEW_BUFFER_CHUNKS as usize;

/// Streaming configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Neighborhood radius in chunks (1 to [`MAX_LOAD_RANGE`])
    pub load_range: i32,
    /// Tile writes allowed per frame, across loads and streaming
    pub tile_budget_per_frame: u32,
    /// Tiles a streaming session may write per frame
    pub stream_tiles_per_frame: u32,
    /// Chunks that may be loaded whole in one frame
    pub max_chunks_per_frame: u32,
    /// Which records go when the residency table overflows
    pub eviction_policy: EvictionPolicy,
    /// Whether the buffer origin follows the viewer
    pub recenter_buffer: bool,
    /// Distance in chunks from the buffer edge that triggers a recenter
    pub recenter_margin: i32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            load_range: LOAD_RANGE,
            tile_budget_per_frame: MAX_CHUNKS_PER_FRAME * CHUNK_TILES,
            stream_tiles_per_frame: TILES_PER_FRAME,
            max_chunks_per_frame: MAX_CHUNKS_PER_FRAME,
            eviction_policy: EvictionPolicy::Fifo,
            recenter_buffer: false,
            recenter_margin: 1,
        }
    }
}

impl StreamingConfig {
    /// Clamps values to valid ranges.
    pub fn validate(&mut self) {
        self.load_range = self.load_range.clamp(1, MAX_LOAD_RANGE);
        self.tile_budget_per_frame = self.tile_budget_per_frame.max(1);
        self.stream_tiles_per_frame = self.stream_tiles_per_frame.clamp(1, CHUNK_TILES);
        self.max_chunks_per_frame = self.max_chunks_per_frame.max(1);
        self.recenter_margin = self.recenter_margin.clamp(0, VIEW_BUFFER_CHUNKS / 2 - 1);
    }
}

/// Counters for the most recent `update()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Chunks that became fully loaded
    pub chunks_processed: u32,
    /// Tiles written into the view buffer
    pub tiles_transferred: u32,
    /// Records evicted for leaving the neighborhood or losing their slot
    pub chunks_evicted: u32,
    /// Records evicted because the residency table was full
    pub overflow_evictions: u32,
    /// Whether the buffer origin moved
    pub buffer_recentered: bool,
}

/// Residency utilization snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferMetrics {
    /// Records in the `Loaded` state
    pub loaded_chunks: usize,
    /// Records in the `Loading` state
    pub loading_chunks: usize,
    /// Residency table capacity
    pub capacity: usize,
    /// Share of the capacity in use, 0 to 100
    pub utilization_percent: f32,
}

/// Keeps the viewer's chunk neighborhood resident in the view buffer.
pub struct ChunkManager<S: TileSource = WorldMap> {
    config: StreamingConfig,
    source: Option<S>,
    buffer: ViewBuffer,
    residency: ResidencyTable,
    session: Option<StreamingSession>,
    budget: TransferBudget,
    buffer_origin: TilePos,
    player_chunk: ChunkPos,
    needs_vram_update: bool,
    stats: FrameStats,
}

impl<S: TileSource> ChunkManager<S> {
    /// Creates an uninitialized manager. Call [`Self::init`] before use.
    #[must_use]
    pub fn new(mut config: StreamingConfig) -> Self {
        config.validate();
        info!(
            "Creating chunk manager: load_range={}, budget={} tiles/frame, policy={:?}",
            config.load_range, config.tile_budget_per_frame, config.eviction_policy
        );
        let budget = TransferBudget::new(config.tile_budget_per_frame);
        Self {
            config,
            source: None,
            buffer: ViewBuffer::new(),
            residency: ResidencyTable::new(),
            session: None,
            budget,
            buffer_origin: TilePos::new(0, 0),
            player_chunk: ChunkPos::default(),
            needs_vram_update: false,
            stats: FrameStats::default(),
        }
    }

    /// Installs a tile source and resets all streaming state.
    ///
    /// A source with a non-positive dimension is rejected and the manager
    /// is left untouched.
    pub fn init(&mut self, source: S) -> StreamResult<()> {
        if source.width_tiles() <= 0 || source.height_tiles() <= 0 {
            return Err(WorldError::InvalidData(format!(
                "tile source reports {}x{} tiles",
                source.width_tiles(),
                source.height_tiles()
            ))
            .into());
        }
        info!(
            "Initializing chunk manager for {}x{} tile world",
            source.width_tiles(),
            source.height_tiles()
        );
        self.source = Some(source);
        self.buffer.clear();
        self.residency.clear();
        self.session = None;
        self.budget.reset();
        self.buffer_origin = TilePos::new(0, 0);
        self.player_chunk = ChunkPos::default();
        self.needs_vram_update = false;
        self.stats = FrameStats::default();
        Ok(())
    }

    /// Advances streaming by one frame for a viewer at `viewer_pos` (world
    /// pixels).
    ///
    /// Returns `true` if the frame advanced a streaming session or left one
    /// in progress.
    pub fn update(&mut self, viewer_pos: Vec2) -> StreamResult<bool> {
        let Some(source) = self.source.as_ref() else {
            return Err(StreamError::Uninitialized);
        };
        let (width, height) = (source.width_chunks(), source.height_chunks());

        self.stats = FrameStats::default();
        self.budget.reset();
        self.player_chunk = ChunkPos::from_world_pixels(viewer_pos).clamped(width, height);

        if self.session.is_some() {
            self.stream_pending_chunk();
            return Ok(true);
        }

        self.determine_needed_chunks();

        if self.config.recenter_buffer {
            self.recenter_buffer_if_needed();
        }

        Ok(self.session.is_some())
    }

    /// Uploads the view buffer to `target` if it changed since the last
    /// commit. Returns whether an upload happened.
    pub fn commit_to_vram<T: VramTarget + ?Sized>(&mut self, target: &mut T) -> StreamResult<bool> {
        if self.source.is_none() {
            return Err(StreamError::Uninitialized);
        }
        if !self.needs_vram_update {
            return Ok(false);
        }
        target.upload(self.buffer.as_bytes());
        self.needs_vram_update = false;
        Ok(true)
    }

    /// Converts a world pixel position to buffer coordinates.
    #[must_use]
    pub fn world_to_buffer(&self, world_pos: Vec2) -> Vec2 {
        transform::world_to_buffer(world_pos, self.buffer_origin)
    }

    /// Converts buffer coordinates back to a world pixel position.
    #[must_use]
    pub fn buffer_to_world(&self, buffer_pos: Vec2) -> Vec2 {
        transform::buffer_to_world(buffer_pos, self.buffer_origin)
    }

    /// Reads a tile index straight from the source, bypassing the buffer.
    ///
    /// Returns 0 outside the world or before `init`.
    #[must_use]
    pub fn get_tile_at_world(&self, tile_x: i32, tile_y: i32) -> u8 {
        self.source
            .as_ref()
            .map_or(0, |source| source.cell_at(tile_x, tile_y).tile_index())
    }

    /// Checks if the chunk containing a world pixel position is loaded.
    #[must_use]
    pub fn is_position_loaded(&self, world_pos: Vec2) -> bool {
        self.residency
            .is_loaded(ChunkPos::from_world_pixels(world_pos))
    }

    /// Returns the residency state of a chunk.
    #[must_use]
    pub fn chunk_state(&self, chunk: ChunkPos) -> ChunkState {
        self.residency.state_of(chunk)
    }

    /// Returns the buffered cell for a world tile whose chunk is loaded.
    #[must_use]
    pub fn buffer_cell_at_world(&self, tile_x: i32, tile_y: i32) -> Option<MapCell> {
        let tile = TilePos::new(tile_x, tile_y);
        self.residency
            .is_loaded_in_slot(tile.to_chunk_pos())
            .then(|| self.buffer.cell_at_tile(tile))
    }

    /// Buffer origin in world tiles.
    #[must_use]
    pub const fn buffer_origin(&self) -> TilePos {
        self.buffer_origin
    }

    /// Chunk the viewer occupied at the last update.
    #[must_use]
    pub const fn player_chunk(&self) -> ChunkPos {
        self.player_chunk
    }

    /// Checks if a chunk is partway through streaming.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.session.is_some()
    }

    /// The active streaming session, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&StreamingSession> {
        self.session.as_ref()
    }

    /// Checks if the buffer changed since the last commit.
    #[must_use]
    pub const fn needs_vram_update(&self) -> bool {
        self.needs_vram_update
    }

    /// Iterates the fully loaded chunks, oldest first.
    pub fn loaded_chunks(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.residency
            .iter()
            .filter(|r| r.state == ChunkState::Loaded)
            .map(|r| r.chunk)
    }

    /// Number of fully loaded chunks.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.residency.count_in_state(ChunkState::Loaded)
    }

    /// The view buffer.
    #[must_use]
    pub const fn view_buffer(&self) -> &ViewBuffer {
        &self.buffer
    }

    /// The residency table.
    #[must_use]
    pub const fn residency(&self) -> &ResidencyTable {
        &self.residency
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Counters for the most recent update.
    #[must_use]
    pub const fn frame_stats(&self) -> FrameStats {
        self.stats
    }

    /// Returns a residency utilization snapshot.
    #[must_use]
    pub fn metrics(&self) -> BufferMetrics {
        let capacity = self.residency.capacity();
        BufferMetrics {
            loaded_chunks: self.residency.count_in_state(ChunkState::Loaded),
            loading_chunks: self.residency.count_in_state(ChunkState::Loading),
            capacity,
            utilization_percent: self.residency.len() as f32 * 100.0 / capacity as f32,
        }
    }

    /// Checks if a source has been installed.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.source.is_some()
    }

    /// Verifies residency and budget invariants.
    pub fn check_invariants(&self) -> StreamResult<()> {
        self.residency.check_invariants()?;

        if self.stats.tiles_transferred > self.config.tile_budget_per_frame {
            return Err(StreamError::InvariantViolation(format!(
                "{} tiles transferred against a budget of {}",
                self.stats.tiles_transferred, self.config.tile_budget_per_frame
            )));
        }
        if let Some(session) = &self.session {
            let state = self.residency.state_of(session.chunk());
            if state != ChunkState::Loading {
                return Err(StreamError::InvariantViolation(format!(
                    "streaming chunk {} is {} instead of LOADING",
                    session.chunk(),
                    state
                )));
            }
        }
        Ok(())
    }

    /// Writes the next tiles of the active session and finishes it when
    /// the chunk is complete.
    fn stream_pending_chunk(&mut self) {
        let (Some(source), Some(session)) = (self.source.as_ref(), self.session.as_mut()) else {
            return;
        };

        let granted = self
            .budget
            .take(self.config.stream_tiles_per_frame.min(session.remaining()));
        let written = session.advance(granted, source, &mut self.buffer);
        self.stats.tiles_transferred += written;
        if written > 0 {
            self.needs_vram_update = true;
        }

        if !session.is_complete() {
            return;
        }

        let chunk = session.chunk();
        self.session = None;
        if !self.residency.set_state(chunk, ChunkState::Loaded) {
            // Record lost to an overflow eviction while streaming.
            self.residency.evict_slot(chunk.buffer_slot());
            let evicted = self.residency.insert(
                LoadedChunk::new(chunk, ChunkState::Loaded),
                self.config.eviction_policy,
                self.player_chunk,
            );
            self.stats.overflow_evictions += evicted as u32;
        }
        self.stats.chunks_processed += 1;
        debug!("Finished streaming chunk {}", chunk);
    }

    /// Evicts chunks outside the neighborhood and writes missing ones
    /// nearest-first within the frame budget.
    fn determine_needed_chunks(&mut self) {
        let Some(source) = self.source.as_ref() else {
            return;
        };
        let (width, height) = (source.width_chunks(), source.height_chunks());
        let center = self.player_chunk;
        let policy = self.config.eviction_policy;

        let evicted = self
            .residency
            .evict_outside(center, self.config.load_range.unsigned_abs());
        self.stats.chunks_evicted += evicted as u32;

        let mut claimed = [[false; SLOTS]; SLOTS];
        let mut loaded_this_frame = 0;

        for chunk in neighborhood(center, self.config.load_range) {
            if !chunk.is_within(width, height) {
                continue;
            }

            let slot = chunk.buffer_slot();
            let claim = &mut claimed[slot.y as usize][slot.x as usize];
            if *claim {
                continue;
            }
            *claim = true;

            if self.residency.is_loaded_in_slot(chunk) {
                continue;
            }

            if self.budget.remaining() >= CHUNK_TILES {
                if loaded_this_frame >= self.config.max_chunks_per_frame {
                    break;
                }

                self.stats.chunks_evicted += self.residency.evict_slot(slot) as u32;
                let granted = self.budget.take(CHUNK_TILES);
                let written = StreamingSession::new(chunk).advance(granted, source, &mut self.buffer);
                self.stats.tiles_transferred += written;

                let evicted =
                    self.residency
                        .insert(LoadedChunk::new(chunk, ChunkState::Loaded), policy, center);
                self.stats.overflow_evictions += evicted as u32;
                self.stats.chunks_processed += 1;
                self.needs_vram_update = true;
                loaded_this_frame += 1;
                debug!("Loaded chunk {} into slot ({}, {})", chunk, slot.x, slot.y);
            } else {
                if !self.budget.is_exhausted() {
                    self.stats.chunks_evicted += self.residency.evict_slot(slot) as u32;
                    let evicted = self.residency.insert(
                        LoadedChunk::new(chunk, ChunkState::Loading),
                        policy,
                        center,
                    );
                    self.stats.overflow_evictions += evicted as u32;

                    let mut session = StreamingSession::new(chunk);
                    let granted = self
                        .budget
                        .take(self.config.stream_tiles_per_frame.min(session.remaining()));
                    let written = session.advance(granted, source, &mut self.buffer);
                    self.stats.tiles_transferred += written;
                    if written > 0 {
                        self.needs_vram_update = true;
                    }
                    self.session = Some(session);
                    debug!(
                        "Started streaming chunk {} ({}/{} tiles)",
                        chunk, written, CHUNK_TILES
                    );
                }
                break;
            }
        }
    }

    /// Moves the buffer origin when the viewer nears the buffer edge.
    fn recenter_buffer_if_needed(&mut self) {
        let Some(source) = self.source.as_ref() else {
            return;
        };

        let origin_chunk = self.buffer_origin.to_chunk_pos();
        let margin = self.config.recenter_margin;
        let max_x = (source.width_chunks() - VIEW_BUFFER_CHUNKS).max(0);
        let max_y = (source.height_chunks() - VIEW_BUFFER_CHUNKS).max(0);

        // Shift only by how far the player overshoots the margin.
        let recenter_axis = |player: i32, origin: i32, max: i32| {
            let last = origin + VIEW_BUFFER_CHUNKS - 1;
            let delta = if player - origin < margin {
                player - origin - margin
            } else if last - player < margin {
                player + margin - last
            } else {
                0
            };
            (origin + delta).clamp(0, max)
        };

        let new_origin = ChunkPos::new(
            recenter_axis(self.player_chunk.x, origin_chunk.x, max_x),
            recenter_axis(self.player_chunk.y, origin_chunk.y, max_y),
        );
        if new_origin != origin_chunk {
            debug!(
                "Recentering buffer origin from chunk {} to {}",
                origin_chunk, new_origin
            );
            self.buffer_origin = TilePos::new(
                new_origin.x * CHUNK_SIZE_TILES,
                new_origin.y * CHUNK_SIZE_TILES,
            );
            self.stats.buffer_recentered = true;
        }
    }
}

impl<S: TileSource> std::fmt::Debug for ChunkManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkManager")
            .field("initialized", &self.is_initialized())
            .field("player_chunk", &self.player_chunk)
            .field("buffer_origin", &self.buffer_origin)
            .field("loaded", &self.loaded_count())
            .field("streaming", &self.session)
            .field("needs_vram_update", &self.needs_vram_update)
            .finish_non_exhaustive()
    }
}

/// Chunks of the square around `center`, nearest ring first and row-major
/// within each ring.
fn neighborhood(center: ChunkPos, range: i32) -> impl Iterator<Item = ChunkPos> {
    (0..=range).flat_map(move |ring| {
        (-ring..=ring).flat_map(move |dy| {
            (-ring..=ring).filter_map(move |dx| {
                (dx.abs().max(dy.abs()) == ring)
                    .then_some(ChunkPos::new(center.x + dx, center.y + dy))
            })
        })
    })
}
