//! Engine configuration.
//!
//! Describes the world to stream, the viewer path and the run length.
//! Configuration can be loaded from and saved to a TOML file.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tilestream_common::{CHUNK_SIZE_TILES, WORLD_HEIGHT_TILES, WORLD_WIDTH_TILES};
use tilestream_world::StreamingConfig;
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "tilestream.toml";

/// Largest accepted world side in tiles.
const MAX_WORLD_TILES: i32 = 1 << 16;

/// Which tile source backs the world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Seeded procedural terrain
    #[default]
    Procedural,
    /// Every tile holds `flat_tile`
    Flat,
}

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === World Settings ===
    /// Tile source kind
    pub source: SourceKind,
    /// Procedural seed
    pub seed: u64,
    /// World width in tiles
    pub world_width_tiles: i32,
    /// World height in tiles
    pub world_height_tiles: i32,
    /// Tile index used by the flat source
    pub flat_tile: u8,

    // === Viewer Settings ===
    /// Viewer start position in world pixels
    pub spawn: [f32; 2],
    /// Viewer motion in pixels per frame
    pub velocity: [f32; 2],

    // === Run Settings ===
    /// Frames to simulate
    pub frames: u32,
    /// Frames between progress log lines (0 = only the final summary)
    pub stats_interval: u32,
    /// Verify residency invariants after every frame
    pub check_invariants: bool,

    // === Streaming ===
    /// Chunk streaming parameters
    pub streaming: StreamingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // World
            source: SourceKind::Procedural,
            seed: 0x7113_57EA,
            world_width_tiles: WORLD_WIDTH_TILES,
            world_height_tiles: WORLD_HEIGHT_TILES,
            flat_tile: 1,

            // Viewer: world center, drifting east-south-east
            spawn: [4096.0, 4096.0],
            velocity: [6.0, 2.5],

            // Run
            frames: 600,
            stats_interval: 60,
            check_invariants: cfg!(debug_assertions),

            streaming: StreamingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the path given on the command line, or from
    /// `tilestream.toml` in the working directory.
    pub fn load_from_args() -> Self {
        let path = std::env::args_os()
            .nth(1)
            .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
        Self::load_from(path)
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read {}: {e}, using defaults", path.display());
                return Self::default();
            },
        };

        toml::from_str(&contents).map_or_else(
            |e| {
                warn!("Failed to parse {}: {e}, using defaults", path.display());
                Self::default()
            },
            |config| {
                info!("Loaded streaming config from {}", path.display());
                config
            },
        )
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved streaming config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        // World: at least one chunk per axis
        self.world_width_tiles = self.world_width_tiles.clamp(CHUNK_SIZE_TILES, MAX_WORLD_TILES);
        self.world_height_tiles = self
            .world_height_tiles
            .clamp(CHUNK_SIZE_TILES, MAX_WORLD_TILES);

        // Viewer
        for value in self.spawn.iter_mut().chain(self.velocity.iter_mut()) {
            if !value.is_finite() {
                *value = 0.0;
            }
        }

        // Run
        self.frames = self.frames.max(1);

        self.streaming.validate();
    }

    /// Viewer start position.
    #[must_use]
    pub fn spawn_position(&self) -> Vec2 {
        Vec2::from(self.spawn)
    }

    /// Viewer velocity.
    #[must_use]
    pub fn viewer_velocity(&self) -> Vec2 {
        Vec2::from(self.velocity)
    }
}
