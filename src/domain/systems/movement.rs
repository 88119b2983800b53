// Intent-driven tank motion. Translation is gated on the wall grid only;
// tank-vs-tank blocking is intentionally not part of the movement
// contract. Rotation is never gated.

use crate::domain::grid::TileGrid;
use crate::domain::state::Tank;
use crate::domain::systems::collision::{self, Rect};
use crate::domain::tuning::tank::TankTuning;

/// Normalizes a degree value into [0,360).
pub fn wrap_angle(degrees: i32) -> i16 {
    degrees.rem_euclid(360) as i16
}

/// One tick of travel along a heading. Angle 0 points up the screen, so y
/// shrinks as a body moves forward.
pub fn advance(x: f32, y: f32, angle: i16, speed: f32) -> (f32, f32) {
    let radians = f32::from(angle).to_radians();
    (x + radians.sin() * speed, y - radians.cos() * speed)
}

pub fn tick_tank(tank: &mut Tank, grid: &TileGrid, cfg: &TankTuning) {
    if tank.intents.forward {
        let (x, y) = advance(tank.x, tank.y, tank.angle, cfg.speed);
        commit_if_clear(tank, x, y, grid);
    }
    if tank.intents.backward {
        let (x, y) = advance(tank.x, tank.y, tank.angle, -cfg.speed);
        commit_if_clear(tank, x, y, grid);
    }

    if tank.intents.turn_left {
        tank.angle = wrap_angle(i32::from(tank.angle) - i32::from(cfg.turn_step));
    }
    if tank.intents.turn_right {
        tank.angle = wrap_angle(i32::from(tank.angle) + i32::from(cfg.turn_step));
    }
}

fn commit_if_clear(tank: &mut Tank, x: f32, y: f32, grid: &TileGrid) {
    let candidate = Rect::new(x, y, tank.width, tank.height);
    if !collision::collides_with_grid(&candidate, grid) {
        tank.x = x;
        tank.y = y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::{TILE_HEIGHT, TILE_WIDTH};

    fn tank_at(x: f32, y: f32) -> Tank {
        Tank::new(0, x, y, &TankTuning::default())
    }

    #[test]
    fn when_driving_forward_at_angle_zero_then_y_strictly_decreases_and_x_holds() {
        let grid = TileGrid::empty();
        let cfg = TankTuning::default();
        let mut tank = tank_at(100.0, 100.0);
        tank.intents.forward = true;

        let mut last_y = tank.y;
        for _ in 0..3 {
            tick_tank(&mut tank, &grid, &cfg);
            assert!(tank.y < last_y);
            last_y = tank.y;
        }
        assert_eq!(tank.x, 100.0);
        assert_eq!(tank.y, 100.0 - 3.0 * cfg.speed);
    }

    #[test]
    fn when_the_candidate_position_hits_a_wall_then_the_tank_stays_put() {
        let mut grid = TileGrid::empty();
        let cfg = TankTuning::default();
        // Wall directly above the tank's starting tile.
        let col = 10;
        let row = 10;
        grid.set_wall(col, row, true);

        let start_y = (row + 1) as f32 * TILE_HEIGHT + 1.0;
        let mut tank = tank_at(col as f32 * TILE_WIDTH, start_y);
        tank.intents.forward = true;

        for _ in 0..10 {
            tick_tank(&mut tank, &grid, &cfg);
        }
        // Every 3px step would overlap the wall, so no step commits.
        assert_eq!(tank.y, start_y);
    }

    #[test]
    fn when_rotating_past_zero_then_angle_wraps_into_range() {
        let grid = TileGrid::empty();
        let cfg = TankTuning::default();
        let mut tank = tank_at(100.0, 100.0);
        tank.intents.turn_left = true;

        tick_tank(&mut tank, &grid, &cfg);
        assert_eq!(tank.angle, 360 - cfg.turn_step);

        tank.intents.turn_left = false;
        tank.intents.turn_right = true;
        tick_tank(&mut tank, &grid, &cfg);
        assert_eq!(tank.angle, 0);
    }

    #[test]
    fn when_no_intents_are_raised_then_nothing_changes() {
        let grid = TileGrid::empty();
        let cfg = TankTuning::default();
        let mut tank = tank_at(100.0, 100.0);

        tick_tank(&mut tank, &grid, &cfg);
        assert_eq!((tank.x, tank.y, tank.angle), (100.0, 100.0, 0));
    }
}
