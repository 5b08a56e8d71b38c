//! Tile sources: the ground truth behind the view buffer.
//!
//! A source answers "what tile is at world coordinate (x, y)". It is built
//! once per world and never changes afterwards, which is what lets the chunk
//! manager drop and reload chunks freely.

use serde::{Deserialize, Serialize};
use tilestream_common::{WorldError, WorldResult, CHUNK_SIZE_TILES, WORLD_HEIGHT_TILES, WORLD_WIDTH_TILES};

use crate::cell::MapCell;

/// Provider of a tile value for any world tile coordinate.
pub trait TileSource {
    /// World width in tiles.
    fn width_tiles(&self) -> i32;

    /// World height in tiles.
    fn height_tiles(&self) -> i32;

    /// Returns the cell at an in-bounds tile coordinate.
    ///
    /// Only called with coordinates for which [`TileSource::contains`] holds.
    fn cell_in_bounds(&self, tile_x: i32, tile_y: i32) -> MapCell;

    /// Checks whether a tile coordinate lies inside the world.
    fn contains(&self, tile_x: i32, tile_y: i32) -> bool {
        tile_x >= 0 && tile_x < self.width_tiles() && tile_y >= 0 && tile_y < self.height_tiles()
    }

    /// Returns the cell at a tile coordinate, or [`MapCell::EMPTY`] outside the world.
    fn cell_at(&self, tile_x: i32, tile_y: i32) -> MapCell {
        if self.contains(tile_x, tile_y) {
            self.cell_in_bounds(tile_x, tile_y)
        } else {
            MapCell::EMPTY
        }
    }

    /// World width in chunks (partial chunks count).
    fn width_chunks(&self) -> i32 {
        (self.width_tiles() + CHUNK_SIZE_TILES - 1) / CHUNK_SIZE_TILES
    }

    /// World height in chunks (partial chunks count).
    fn height_chunks(&self) -> i32 {
        (self.height_tiles() + CHUNK_SIZE_TILES - 1) / CHUNK_SIZE_TILES
    }
}

impl<T: TileSource + ?Sized> TileSource for Box<T> {
    fn width_tiles(&self) -> i32 {
        (**self).width_tiles()
    }

    fn height_tiles(&self) -> i32 {
        (**self).height_tiles()
    }

    fn cell_in_bounds(&self, tile_x: i32, tile_y: i32) -> MapCell {
        (**self).cell_in_bounds(tile_x, tile_y)
    }
}

fn check_dimensions(width_tiles: i32, height_tiles: i32) -> WorldResult<()> {
    if width_tiles <= 0 || height_tiles <= 0 {
        return Err(WorldError::InvalidData(format!(
            "world dimensions must be positive, got {width_tiles}x{height_tiles}"
        )));
    }
    Ok(())
}

/// Source backed by a flat, row-major tile array.
#[derive(Debug, Clone)]
pub struct StaticArraySource {
    cells: Vec<MapCell>,
    width_tiles: i32,
    height_tiles: i32,
}

impl StaticArraySource {
    /// Wraps a row-major cell array of `width_tiles × height_tiles` cells.
    pub fn new(cells: Vec<MapCell>, width_tiles: i32, height_tiles: i32) -> WorldResult<Self> {
        check_dimensions(width_tiles, height_tiles)?;
        let expected = width_tiles as usize * height_tiles as usize;
        if cells.len() != expected {
            return Err(WorldError::InvalidData(format!(
                "expected {expected} cells for a {width_tiles}x{height_tiles} map, got {}",
                cells.len()
            )));
        }
        Ok(Self {
            cells,
            width_tiles,
            height_tiles,
        })
    }

    /// Builds a map by evaluating `f` for every tile.
    pub fn from_fn<F>(width_tiles: i32, height_tiles: i32, mut f: F) -> WorldResult<Self>
    where
        F: FnMut(i32, i32) -> MapCell,
    {
        check_dimensions(width_tiles, height_tiles)?;
        let mut cells = Vec::with_capacity(width_tiles as usize * height_tiles as usize);
        for y in 0..height_tiles {
            for x in 0..width_tiles {
                cells.push(f(x, y));
            }
        }
        Self::new(cells, width_tiles, height_tiles)
    }

    /// Builds a map where every tile holds `cell`.
    pub fn filled(width_tiles: i32, height_tiles: i32, cell: MapCell) -> WorldResult<Self> {
        Self::from_fn(width_tiles, height_tiles, |_, _| cell)
    }

    /// Returns the backing cells.
    #[must_use]
    pub fn cells(&self) -> &[MapCell] {
        &self.cells
    }
}

impl TileSource for StaticArraySource {
    fn width_tiles(&self) -> i32 {
        self.width_tiles
    }

    fn height_tiles(&self) -> i32 {
        self.height_tiles
    }

    fn cell_in_bounds(&self, tile_x: i32, tile_y: i32) -> MapCell {
        let index = tile_y as usize * self.width_tiles as usize + tile_x as usize;
        self.cells.get(index).copied().unwrap_or(MapCell::EMPTY)
    }
}

/// Procedural generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProceduralParams {
    /// World width in tiles
    pub width_tiles: i32,
    /// World height in tiles
    pub height_tiles: i32,
    /// First tile index used for terrain
    pub first_terrain_tile: u8,
    /// Number of distinct terrain tiles
    pub terrain_tiles: u8,
    /// Log2 of the side, in tiles, of one terrain patch
    pub region_shift: u32,
    /// Tile index scattered over the terrain as features
    pub feature_tile: u8,
    /// Feature frequency in tiles per thousand
    pub feature_per_mille: u16,
}

impl Default for ProceduralParams {
    fn default() -> Self {
        Self {
            width_tiles: WORLD_WIDTH_TILES,
            height_tiles: WORLD_HEIGHT_TILES,
            first_terrain_tile: 5,
            terrain_tiles: 4,
            region_shift: 3,
            feature_tile: 3,
            feature_per_mille: 20,
        }
    }
}

const REGION_SALT: u64 = 0xD6E8_FEB8_6659_FD93;

/// Integer hash of a tile coordinate and a seed (splitmix64 finalizer).
#[must_use]
pub const fn hash_tile(tile_x: i32, tile_y: i32, seed: u64) -> u64 {
    let mut h = seed ^ 0x9E37_79B9_7F4A_7C15;
    h ^= (tile_x as u32 as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = h.rotate_left(27);
    h ^= (tile_y as u32 as u64).wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^= h >> 30;
    h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h ^= h >> 27;
    h = h.wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^= h >> 31;
    h
}

/// Deterministic procedural source.
///
/// Terrain is picked per patch of `2^region_shift` tiles so neighbouring
/// tiles agree, with single-tile features sprinkled on top. Every tile is a
/// pure function of `(tile_x, tile_y, seed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProceduralSource {
    seed: u64,
    params: ProceduralParams,
}

impl ProceduralSource {
    /// Creates a procedural source.
    pub fn new(seed: u64, params: ProceduralParams) -> WorldResult<Self> {
        check_dimensions(params.width_tiles, params.height_tiles)?;
        if params.terrain_tiles == 0 {
            return Err(WorldError::InvalidData(
                "procedural source needs at least one terrain tile".into(),
            ));
        }
        if params.region_shift >= 16 {
            return Err(WorldError::InvalidData(format!(
                "region_shift {} is too large",
                params.region_shift
            )));
        }
        Ok(Self { seed, params })
    }

    /// Creates a default-sized world with the given seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            params: ProceduralParams::default(),
        }
    }

    /// Returns the seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the generation parameters.
    #[must_use]
    pub const fn params(&self) -> &ProceduralParams {
        &self.params
    }
}

impl TileSource for ProceduralSource {
    fn width_tiles(&self) -> i32 {
        self.params.width_tiles
    }

    fn height_tiles(&self) -> i32 {
        self.params.height_tiles
    }

    fn cell_in_bounds(&self, tile_x: i32, tile_y: i32) -> MapCell {
        let p = &self.params;

        let detail = hash_tile(tile_x, tile_y, self.seed);
        if detail % 1000 < u64::from(p.feature_per_mille) {
            return MapCell::new(p.feature_tile);
        }

        let region = hash_tile(
            tile_x >> p.region_shift,
            tile_y >> p.region_shift,
            self.seed ^ REGION_SALT,
        );
        let offset = (region % u64::from(p.terrain_tiles)) as u8;
        MapCell::new(p.first_terrain_tile.wrapping_add(offset))
    }
}

/// Source backed by a closure over tile coordinates.
///
/// The closure must be pure: chunks are reloaded repeatedly as the viewer
/// moves back and forth.
pub struct ProviderSource<F> {
    provider: F,
    width_tiles: i32,
    height_tiles: i32,
}

impl<F> ProviderSource<F>
where
    F: Fn(i32, i32) -> MapCell,
{
    /// Wraps a provider closure.
    pub fn new(provider: F, width_tiles: i32, height_tiles: i32) -> WorldResult<Self> {
        check_dimensions(width_tiles, height_tiles)?;
        Ok(Self {
            provider,
            width_tiles,
            height_tiles,
        })
    }
}

impl<F> TileSource for ProviderSource<F>
where
    F: Fn(i32, i32) -> MapCell,
{
    fn width_tiles(&self) -> i32 {
        self.width_tiles
    }

    fn height_tiles(&self) -> i32 {
        self.height_tiles
    }

    fn cell_in_bounds(&self, tile_x: i32, tile_y: i32) -> MapCell {
        (self.provider)(tile_x, tile_y)
    }
}

impl<F> std::fmt::Debug for ProviderSource<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSource")
            .field("width_tiles", &self.width_tiles)
            .field("height_tiles", &self.height_tiles)
            .finish_non_exhaustive()
    }
}

/// World descriptor: one of the built-in backings.
#[derive(Debug, Clone)]
pub enum WorldMap {
    /// Flat tile array
    Static(StaticArraySource),
    /// Seeded procedural generator
    Procedural(ProceduralSource),
}

impl WorldMap {
    /// Describes a world stored as a flat tile array.
    pub fn from_cells(cells: Vec<MapCell>, width_tiles: i32, height_tiles: i32) -> WorldResult<Self> {
        StaticArraySource::new(cells, width_tiles, height_tiles).map(Self::Static)
    }

    /// Describes a procedurally generated world.
    pub fn procedural(seed: u64, params: ProceduralParams) -> WorldResult<Self> {
        ProceduralSource::new(seed, params).map(Self::Procedural)
    }
}

impl TileSource for WorldMap {
    fn width_tiles(&self) -> i32 {
        match self {
            Self::Static(source) => source.width_tiles(),
            Self::Procedural(source) => source.width_tiles(),
        }
    }

    fn height_tiles(&self) -> i32 {
        match self {
            Self::Static(source) => source.height_tiles(),
            Self::Procedural(source) => source.height_tiles(),
        }
    }

    fn cell_in_bounds(&self, tile_x: i32, tile_y: i32) -> MapCell {
        match self {
            Self::Static(source) => source.cell_in_bounds(tile_x, tile_y),
            Self::Procedural(source) => source.cell_in_bounds(tile_x, tile_y),
        }
    }
}
