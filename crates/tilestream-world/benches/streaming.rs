use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use glam::Vec2;
use tilestream_common::{WORLD_HEIGHT_PIXELS, WORLD_WIDTH_PIXELS};
use tilestream_world::{ChunkManager, HostTileMap, ProceduralParams, StreamingConfig, WorldMap};

fn world() -> WorldMap {
    WorldMap::procedural(0xC0FFEE, ProceduralParams::default()).expect("valid world")
}

fn bench_settle_from_cold(c: &mut Criterion) {
    let center = Vec2::splat(4128.0);

    c.bench_function("settle_from_cold", |b| {
        b.iter_batched(
            || {
                let mut manager = ChunkManager::new(StreamingConfig::default());
                manager.init(world()).expect("init failed");
                manager
            },
            |mut manager| {
                for _ in 0..12 {
                    manager.update(black_box(center)).expect("update failed");
                }
                manager
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_moving_viewer_frame(c: &mut Criterion) {
    let mut manager = ChunkManager::new(StreamingConfig::default());
    manager.init(world()).expect("init failed");
    let mut target = HostTileMap::new();
    let center = Vec2::new(
        WORLD_WIDTH_PIXELS as f32 / 2.0,
        WORLD_HEIGHT_PIXELS as f32 / 2.0,
    );

    c.bench_function("moving_viewer_frame", |b| {
        let mut frame = 0u32;
        b.iter(|| {
            frame += 1;
            // Circle of radius 3000 px around the world center.
            let angle = frame as f32 * 0.01;
            let pos = center + Vec2::new(angle.cos(), angle.sin()) * 3000.0;
            manager.update(black_box(pos)).expect("update failed");
            manager.commit_to_vram(&mut target).expect("commit failed")
        });
    });
}

criterion_group!(benches, bench_settle_from_cold, bench_moving_viewer_frame);
criterion_main!(benches);
