//! Layout constants shared by the streaming engine and its consumers.
//!
//! The renderer, the collision code and the chunk manager all derive their
//! addressing from these values, so they must agree.

/// Size of one tile in pixels.
pub const TILE_SIZE: i32 = 8;

/// Width and height of a chunk in tiles.
pub const CHUNK_SIZE_TILES: i32 = 8;

/// Width and height of a chunk in pixels.
pub const CHUNK_SIZE_PIXELS: i32 = CHUNK_SIZE_TILES * TILE_SIZE;

/// Number of tiles in one chunk.
pub const CHUNK_TILES: u32 = (CHUNK_SIZE_TILES * CHUNK_SIZE_TILES) as u32;

/// Width and height of the view buffer in chunks.
pub const VIEW_BUFFER_CHUNKS: i32 = 16;

/// Width and height of the view buffer in tiles (affine background limit).
pub const VIEW_BUFFER_TILES: i32 = VIEW_BUFFER_CHUNKS * CHUNK_SIZE_TILES;

/// Width and height of the view buffer in pixels.
pub const VIEW_BUFFER_PIXELS: i32 = VIEW_BUFFER_TILES * TILE_SIZE;

/// Half the view buffer size in pixels; buffer space is centered on zero.
pub const BUFFER_HALF_SIZE: i32 = VIEW_BUFFER_PIXELS / 2;

/// Total number of cells held by the view buffer.
pub const VIEW_BUFFER_CELLS: usize = (VIEW_BUFFER_TILES * VIEW_BUFFER_TILES) as usize;

/// Default world width in chunks.
pub const WORLD_WIDTH_CHUNKS: i32 = 128;

/// Default world height in chunks.
pub const WORLD_HEIGHT_CHUNKS: i32 = 128;

/// Default world width in tiles.
pub const WORLD_WIDTH_TILES: i32 = WORLD_WIDTH_CHUNKS * CHUNK_SIZE_TILES;

/// Default world height in tiles.
pub const WORLD_HEIGHT_TILES: i32 = WORLD_HEIGHT_CHUNKS * CHUNK_SIZE_TILES;

/// Default world width in pixels.
pub const WORLD_WIDTH_PIXELS: i32 = WORLD_WIDTH_TILES * TILE_SIZE;

/// Default world height in pixels.
pub const WORLD_HEIGHT_PIXELS: i32 = WORLD_HEIGHT_TILES * TILE_SIZE;

/// Tiles a streaming session may write per frame.
pub const TILES_PER_FRAME: u32 = 64;

/// Chebyshev radius, in chunks, of the neighborhood kept resident.
pub const LOAD_RANGE: i32 = 4;

/// Maximum immediate chunk loads per frame.
pub const MAX_CHUNKS_PER_FRAME: u32 = 8;

/// Capacity of the chunk residency table.
pub const RESIDENCY_CAPACITY: usize = 128;

/// Records dropped by one emergency eviction when the residency table is full.
pub const OVERFLOW_EVICTION_COUNT: usize = 10;
