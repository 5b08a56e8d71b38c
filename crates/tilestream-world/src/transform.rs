//! World ↔ buffer coordinate transforms.
//!
//! Buffer space is the camera-relative frame of the toroidal view buffer:
//! positions are wrapped into the buffer and centered on zero. Both
//! directions depend on the buffer origin, so a caller must not convert
//! across a recenter.

use glam::Vec2;
use tilestream_common::{TilePos, BUFFER_HALF_SIZE, TILE_SIZE, VIEW_BUFFER_PIXELS};

/// Returns the buffer origin in world pixels.
#[must_use]
pub fn origin_pixels(origin: TilePos) -> Vec2 {
    Vec2::new((origin.x * TILE_SIZE) as f32, (origin.y * TILE_SIZE) as f32)
}

/// Folds `value` into `[0, size)`.
fn wrap_into(value: f32, size: f32) -> f32 {
    let wrapped = value.rem_euclid(size);
    // rem_euclid can round up to `size` for tiny negative inputs.
    if wrapped >= size {
        wrapped - size
    } else {
        wrapped
    }
}

/// Converts a world pixel position to centered buffer coordinates.
#[must_use]
pub fn world_to_buffer(world_pos: Vec2, origin: TilePos) -> Vec2 {
    let size = VIEW_BUFFER_PIXELS as f32;
    let half = BUFFER_HALF_SIZE as f32;
    let relative = world_pos - origin_pixels(origin);

    Vec2::new(
        wrap_into(relative.x, size) - half,
        wrap_into(relative.y, size) - half,
    )
}

/// Converts centered buffer coordinates back to a world pixel position.
///
/// Exact inverse of [`world_to_buffer`] for positions inside the buffer
/// window `[origin, origin + VIEW_BUFFER_PIXELS)`.
#[must_use]
pub fn buffer_to_world(buffer_pos: Vec2, origin: TilePos) -> Vec2 {
    buffer_pos + Vec2::splat(BUFFER_HALF_SIZE as f32) + origin_pixels(origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_buffer_center_is_zero() {
        let origin = TilePos::new(0, 0);
        let centered = world_to_buffer(Vec2::new(512.0, 512.0), origin);
        assert_eq!(centered, Vec2::ZERO);
        assert_eq!(buffer_to_world(Vec2::ZERO, origin), Vec2::new(512.0, 512.0));
    }

    #[test]
    fn test_world_wraps_into_buffer() {
        let origin = TilePos::new(0, 0);
        let a = world_to_buffer(Vec2::new(100.0, 200.0), origin);
        let b = world_to_buffer(Vec2::new(100.0 + 1024.0 * 3.0, 200.0 + 1024.0), origin);
        assert_eq!(a, b);
        assert_eq!(a, Vec2::new(-412.0, -312.0));
    }

    #[test]
    fn test_negative_positions_wrap() {
        let origin = TilePos::new(0, 0);
        let pos = world_to_buffer(Vec2::new(-1.0, -1024.0), origin);
        assert_eq!(pos, Vec2::new(511.0, -512.0));
    }

    #[test]
    fn test_origin_shifts_frame() {
        let origin = TilePos::new(16, 8);
        let pos = world_to_buffer(Vec2::new(128.0, 64.0), origin);
        assert_eq!(pos, Vec2::splat(-512.0));
    }

    #[test]
    fn test_tiny_negative_stays_in_range() {
        let pos = world_to_buffer(Vec2::new(-1e-9, 0.0), TilePos::new(0, 0));
        assert!(pos.x < BUFFER_HALF_SIZE as f32);
        assert!(pos.x >= -(BUFFER_HALF_SIZE as f32));
    }

    proptest! {
        #[test]
        fn prop_round_trip_within_window(
            ox in 0i32..112,
            oy in 0i32..112,
            dx in 0.0f32..1023.0,
            dy in 0.0f32..1023.0,
        ) {
            let origin = TilePos::new(ox * 8, oy * 8);
            let world = origin_pixels(origin) + Vec2::new(dx, dy);
            let back = buffer_to_world(world_to_buffer(world, origin), origin);
            prop_assert!((back - world).abs().max_element() <= 1.0);
        }

        #[test]
        fn prop_buffer_coords_are_centered(x in -20_000.0f32..20_000.0, y in -20_000.0f32..20_000.0) {
            let pos = world_to_buffer(Vec2::new(x, y), TilePos::new(0, 0));
            let half = BUFFER_HALF_SIZE as f32;
            prop_assert!(pos.x >= -half && pos.x < half);
            prop_assert!(pos.y >= -half && pos.y < half);
        }
    }
}
