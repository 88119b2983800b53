// Domain-level simulation entities and snapshot types.

use rand::Rng;

use crate::domain::bullets::BulletQueue;
use crate::domain::grid::TileGrid;
use crate::domain::registry::TankRegistry;
use crate::domain::systems::collision::{self, Rect};
use crate::domain::tuning::tank::TankTuning;

/// Intent flags for one tank, sampled once per tick. Full state, never
/// deltas: a flag stays raised for as long as the control is held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intents {
    pub forward: bool,
    pub backward: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub fire: bool,
    /// Secondary trigger. Carried on the wire but not yet bound to a
    /// simulation effect.
    pub fire_alt: bool,
}

pub struct Tank {
    pub id: u8,
    pub x: f32,
    pub y: f32,
    /// Degrees, kept in [0,360) by the rotation step.
    pub angle: i16,
    /// Collision footprint; constant for the tank's lifetime.
    pub width: f32,
    pub height: f32,

    pub intents: Intents,
    /// Edge latch: fire spawns one bullet per press, not per tick.
    pub fire_held: bool,

    pub bullets: BulletQueue,
}

impl Tank {
    pub fn new(id: u8, x: f32, y: f32, cfg: &TankTuning) -> Self {
        Self {
            id,
            x,
            y,
            angle: 0,
            width: cfg.width,
            height: cfg.height,
            intents: Intents::default(),
            fire_held: false,
            bullets: BulletQueue::new(),
        }
    }

    pub fn hitbox(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Position/orientation snapshot of one tank, decoupled from live
/// simulation state for transmission.
#[derive(Debug, Clone, Copy)]
pub struct TankSnapshot {
    pub id: u8,
    pub x: f32,
    pub y: f32,
    pub angle: i16,
}

impl From<&Tank> for TankSnapshot {
    fn from(tank: &Tank) -> Self {
        Self {
            id: tank.id,
            x: tank.x,
            y: tank.y,
            angle: tank.angle,
        }
    }
}

/// The simulation context: everything one session role mutates per tick.
/// Passed explicitly to every operation; there is no ambient state.
pub struct World {
    pub grid: TileGrid,
    pub tanks: TankRegistry,
}

/// Spawn candidates stay inside these field margins.
const SPAWN_MIN_X: f32 = 10.0;
const SPAWN_MAX_X: f32 = 630.0;
const SPAWN_MIN_Y: f32 = 10.0;
const SPAWN_MAX_Y: f32 = 470.0;

const SPAWN_ATTEMPTS: usize = 64;

impl World {
    pub fn new(grid: TileGrid) -> Self {
        Self {
            grid,
            tanks: TankRegistry::new(),
        }
    }

    /// Picks a uniformly random spawn position inside the field margins,
    /// preferring one whose footprint does not start inside a wall.
    pub fn random_spawn(&self, width: f32, height: f32, rng: &mut impl Rng) -> (f32, f32) {
        let mut candidate = (SPAWN_MIN_X, SPAWN_MIN_Y);
        for _ in 0..SPAWN_ATTEMPTS {
            candidate = (
                rng.random_range(SPAWN_MIN_X..SPAWN_MAX_X),
                rng.random_range(SPAWN_MIN_Y..SPAWN_MAX_Y),
            );
            let footprint = Rect::new(candidate.0, candidate.1, width, height);
            if !collision::collides_with_grid(&footprint, &self.grid) {
                return candidate;
            }
        }
        candidate
    }
}
