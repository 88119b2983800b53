// Axis-aligned collision queries against the tile grid and live tanks.
// Pure reads; callers decide what to do with a hit.

use crate::domain::grid::{GRID_COLS, GRID_ROWS, TILE_HEIGHT, TILE_WIDTH, TileGrid};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Strict overlap: rectangles that merely share an edge do not
    /// intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// World-space rectangle covered by one tile.
pub fn tile_rect(col: usize, row: usize) -> Rect {
    Rect::new(
        col as f32 * TILE_WIDTH,
        row as f32 * TILE_HEIGHT,
        TILE_WIDTH,
        TILE_HEIGHT,
    )
}

/// Returns the first wall tile the box overlaps, scanning candidate tiles
/// row-major (top-to-bottom, left-to-right). That first tile is the
/// authoritative one for bounce tie-breaks.
pub fn grid_hit(rect: &Rect, grid: &TileGrid) -> Option<(usize, usize)> {
    if rect.x + rect.w <= 0.0 || rect.y + rect.h <= 0.0 {
        return None;
    }

    let col_start = ((rect.x.max(0.0)) / TILE_WIDTH) as usize;
    let row_start = ((rect.y.max(0.0)) / TILE_HEIGHT) as usize;
    let col_end = (((rect.x + rect.w).max(0.0)) / TILE_WIDTH) as usize;
    let row_end = (((rect.y + rect.h).max(0.0)) / TILE_HEIGHT) as usize;

    for row in row_start..=row_end.min(GRID_ROWS - 1) {
        for col in col_start..=col_end.min(GRID_COLS - 1) {
            if grid.is_wall(col, row) && rect.intersects(&tile_rect(col, row)) {
                return Some((col, row));
            }
        }
    }
    None
}

pub fn collides_with_grid(rect: &Rect, grid: &TileGrid) -> bool {
    grid_hit(rect, grid).is_some()
}

/// Returns the id of the first live tank whose box overlaps `rect`,
/// excluding the querying entity itself. Boxes are passed as an (id, box)
/// snapshot so the query stays pure while the caller mutates tanks.
pub fn first_overlapping_tank(
    rect: &Rect,
    excluding_id: u8,
    tanks: &[(u8, Rect)],
) -> Option<u8> {
    tanks
        .iter()
        .find(|(id, hitbox)| *id != excluding_id && hitbox.intersects(rect))
        .map(|(id, _)| *id)
}
