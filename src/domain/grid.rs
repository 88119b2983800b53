// Static wall layout for one session: generated by the host, replicated
// verbatim to every client, immutable afterwards.

use rand::Rng;

pub const GRID_COLS: usize = 40;
pub const GRID_ROWS: usize = 40;
/// Row-major wire image size in bytes (one byte per tile, 0/1).
pub const MAP_BYTES: usize = GRID_COLS * GRID_ROWS;

/// Play field is 640x480, so tiles are 16x12.
pub const TILE_WIDTH: f32 = 16.0;
pub const TILE_HEIGHT: f32 = 12.0;

/// Interior wall probability used when no override is configured.
pub const DEFAULT_WALL_DENSITY: f32 = 0.08;

#[derive(Debug)]
pub enum GridError {
    /// Wire image was not exactly `MAP_BYTES` long.
    InvalidLength { got: usize },
}

#[derive(Clone, PartialEq)]
pub struct TileGrid {
    cells: [u8; MAP_BYTES],
}

impl std::fmt::Debug for TileGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let walls = self.cells.iter().filter(|c| **c != 0).count();
        f.debug_struct("TileGrid").field("walls", &walls).finish()
    }
}

impl TileGrid {
    pub fn empty() -> Self {
        Self {
            cells: [0; MAP_BYTES],
        }
    }

    /// Builds a session map: a solid border ring plus uniformly random
    /// interior walls at the given density.
    pub fn generate(rng: &mut impl Rng, wall_density: f32) -> Self {
        let mut grid = Self::empty();
        for row in 0..GRID_ROWS {
            for col in 0..GRID_COLS {
                let border =
                    row == 0 || row == GRID_ROWS - 1 || col == 0 || col == GRID_COLS - 1;
                if border || rng.random::<f32>() < wall_density {
                    grid.set_wall(col, row, true);
                }
            }
        }
        grid
    }

    /// Out-of-range coordinates read as open ground.
    pub fn is_wall(&self, col: usize, row: usize) -> bool {
        if col >= GRID_COLS || row >= GRID_ROWS {
            return false;
        }
        self.cells[row * GRID_COLS + col] != 0
    }

    pub fn set_wall(&mut self, col: usize, row: usize, wall: bool) {
        if col >= GRID_COLS || row >= GRID_ROWS {
            return;
        }
        self.cells[row * GRID_COLS + col] = u8::from(wall);
    }

    /// Row-major wire image, one byte per tile.
    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    /// Rebuilds a grid from a replicated wire image; any nonzero byte is a
    /// wall.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GridError> {
        if bytes.len() != MAP_BYTES {
            return Err(GridError::InvalidLength { got: bytes.len() });
        }
        let mut grid = Self::empty();
        for (cell, byte) in grid.cells.iter_mut().zip(bytes) {
            *cell = u8::from(*byte != 0);
        }
        Ok(grid)
    }
}
