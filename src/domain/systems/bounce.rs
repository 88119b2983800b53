// Reflection-axis choice for a bullet whose next position enters a wall
// tile. The policy is deterministic: vertical-axis reflection by default,
// horizontal-axis when the vertical candidate stays inside the struck tile
// or when the tile to the right of the struck one is also a wall (the
// two-tile corner case a single-tile check gets wrong).

use crate::domain::bullets::Bullet;
use crate::domain::grid::TileGrid;
use crate::domain::systems::collision::{Rect, tile_rect};
use crate::domain::systems::movement::{advance, wrap_angle};

/// Mirrors the travel angle across the vertical axis.
fn reflect_vertical(angle: i16) -> i16 {
    wrap_angle(360 - i32::from(angle))
}

/// Mirrors the travel angle across the horizontal axis.
fn reflect_horizontal(angle: i16) -> i16 {
    wrap_angle(180 - i32::from(angle))
}

/// Picks the reflection axis and rewrites the bullet's orientation.
/// Position is untouched; the caller integrates with the new angle.
pub fn resolve(
    bullet: &mut Bullet,
    struck: (usize, usize),
    grid: &TileGrid,
    speed: f32,
    size: f32,
) {
    let (col, row) = struck;

    let mut horizontal = grid.is_wall(col + 1, row);
    if !horizontal {
        let vertical_angle = reflect_vertical(bullet.angle);
        let (cx, cy) = advance(bullet.x, bullet.y, vertical_angle, speed);
        let candidate = Rect::new(cx, cy, size, size);
        if candidate.intersects(&tile_rect(col, row)) {
            horizontal = true;
        }
    }

    bullet.angle = if horizontal {
        reflect_horizontal(bullet.angle)
    } else {
        reflect_vertical(bullet.angle)
    };
}
