//! Headless frame loop.
//!
//! Moves a viewer across the world and drives the chunk manager once per
//! frame, flushing the view buffer into a host-side tile map.

use anyhow::{ensure, Context, Result};
use glam::Vec2;
use tilestream_common::TILE_SIZE;
use tilestream_world::{
    ChunkManager, HostTileMap, MapCell, ProceduralParams, StaticArraySource, TileSource, WorldMap,
};
use tracing::{debug, info};

use crate::config::{EngineConfig, SourceKind};
use crate::perf::{ScopedTimer, StreamMetrics, StreamSummary};

/// Builds the world described by the configuration.
pub fn build_world(config: &EngineConfig) -> Result<WorldMap> {
    let (width, height) = (config.world_width_tiles, config.world_height_tiles);
    let world = match config.source {
        SourceKind::Procedural => {
            let params = ProceduralParams {
                width_tiles: width,
                height_tiles: height,
                ..Default::default()
            };
            WorldMap::procedural(config.seed, params).context("Failed to build procedural world")?
        },
        SourceKind::Flat => {
            let source = StaticArraySource::filled(width, height, MapCell::new(config.flat_tile))
                .context("Failed to build flat world")?;
            WorldMap::Static(source)
        },
    };
    info!(
        "Built {:?} world: {}x{} tiles ({}x{} chunks)",
        config.source,
        world.width_tiles(),
        world.height_tiles(),
        world.width_chunks(),
        world.height_chunks()
    );
    Ok(world)
}

/// Viewer that drifts at constant velocity and bounces off the world edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewer {
    /// Position in world pixels
    pub position: Vec2,
    /// Motion in pixels per frame
    pub velocity: Vec2,
}

impl Viewer {
    /// Creates a viewer.
    #[must_use]
    pub const fn new(position: Vec2, velocity: Vec2) -> Self {
        Self { position, velocity }
    }

    /// Steps one frame inside `[0, bounds)`.
    pub fn advance(&mut self, bounds: Vec2) {
        let mut next = self.position + self.velocity;
        for axis in 0..2 {
            let limit = bounds[axis] - 1.0;
            if next[axis] < 0.0 || next[axis] > limit {
                self.velocity[axis] = -self.velocity[axis];
                next[axis] = next[axis].clamp(0.0, limit.max(0.0));
            }
        }
        self.position = next;
    }
}

/// Run the configured number of frames and return the run summary.
pub fn run(config: &EngineConfig) -> Result<StreamSummary> {
    let world = build_world(config)?;
    let bounds = Vec2::new(
        (world.width_tiles() * TILE_SIZE) as f32,
        (world.height_tiles() * TILE_SIZE) as f32,
    );

    let mut manager = ChunkManager::new(config.streaming.clone());
    manager.init(world).context("Failed to install world")?;

    let mut target = HostTileMap::new();
    let mut viewer = Viewer::new(config.spawn_position(), config.viewer_velocity());
    let mut metrics = StreamMetrics::default();

    for frame in 1..=config.frames {
        let timer = ScopedTimer::start();
        let streaming = manager
            .update(viewer.position)
            .with_context(|| format!("Update failed on frame {frame}"))?;
        let uploaded = manager.commit_to_vram(&mut target)?;
        let elapsed = timer.stop();

        if config.check_invariants {
            manager
                .check_invariants()
                .with_context(|| format!("Invariant check failed on frame {frame}"))?;
        }

        let stats = manager.frame_stats();
        metrics.record_frame(&stats, streaming, uploaded, elapsed);
        debug!(
            "Frame {}: viewer=({:.1}, {:.1}) chunk={} tiles={} loaded={}",
            frame,
            viewer.position.x,
            viewer.position.y,
            manager.player_chunk(),
            stats.tiles_transferred,
            manager.loaded_count()
        );

        if config.stats_interval > 0 && frame % config.stats_interval == 0 {
            let snapshot = manager.metrics();
            info!(
                "Frame {}: {} loaded, {} loading, residency {:.1}%, origin=({}, {})",
                frame,
                snapshot.loaded_chunks,
                snapshot.loading_chunks,
                snapshot.utilization_percent,
                manager.buffer_origin().x,
                manager.buffer_origin().y
            );
        }

        viewer.advance(bounds);
    }

    ensure!(
        target.upload_count() == 0 || target.cells() == manager.view_buffer().cells(),
        "Tile map diverged from the view buffer"
    );

    let summary = metrics.summary();
    info!("Run complete: {}", summary.format_line());
    Ok(summary)
}
