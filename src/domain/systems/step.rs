// One fixed simulation step: movement for owned tanks, fire edges, and the
// age/hit/bounce pass over every bullet queue. The host owns every tank;
// a client owns only its own and replicates the rest.

use std::time::Instant;

use tracing::info;

use crate::domain::bullets::Bullet;
use crate::domain::state::World;
use crate::domain::systems::bounce;
use crate::domain::systems::collision::{self, Rect};
use crate::domain::systems::movement::{self, advance};
use crate::domain::tuning::bullet::BulletTuning;
use crate::domain::tuning::tank::TankTuning;

#[derive(Debug, Clone, Copy)]
pub struct StepConfig {
    pub tank: TankTuning,
    pub bullet: BulletTuning,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            tank: TankTuning::default(),
            bullet: BulletTuning::default(),
        }
    }
}

/// Which tanks this session role advances. Bullet queues are always aged
/// for every tank regardless of ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owned {
    All,
    One(u8),
}

impl Owned {
    fn covers(self, id: u8) -> bool {
        match self {
            Owned::All => true,
            Owned::One(owned) => owned == id,
        }
    }
}

/// A bullet that left a muzzle this step.
#[derive(Debug, Clone, Copy)]
pub struct BulletSpawn {
    pub owner_id: u8,
    pub x: f32,
    pub y: f32,
    pub angle: i16,
}

/// A bullet connecting with a tank this step.
#[derive(Debug, Clone, Copy)]
pub struct HitReport {
    pub target_id: u8,
    pub shooter_id: u8,
}

#[derive(Debug, Default)]
pub struct StepEvents {
    pub fired: Vec<BulletSpawn>,
    pub hits: Vec<HitReport>,
}

pub fn step(world: &mut World, owned: Owned, now: Instant, cfg: &StepConfig) -> StepEvents {
    let mut events = StepEvents::default();
    let World { grid, tanks } = world;

    // Movement and fire edges for owned tanks.
    for tank in tanks.iter_mut() {
        if !owned.covers(tank.id) {
            continue;
        }

        movement::tick_tank(tank, grid, &cfg.tank);

        if tank.intents.fire && !tank.fire_held {
            tank.fire_held = true;
            let spawn = BulletSpawn {
                owner_id: tank.id,
                x: tank.x + tank.width / 2.0 - (cfg.bullet.size / 2.0 - 1.0),
                y: tank.y + tank.height / 2.0 - (cfg.bullet.size / 2.0 - 1.0),
                angle: tank.angle,
            };
            tank.bullets
                .enqueue(Bullet::new(spawn.x, spawn.y, spawn.angle, now));
            events.fired.push(spawn);
        }
        if !tank.intents.fire {
            tank.fire_held = false;
        }
    }

    // Tank boxes are frozen for the bullet pass: a hit is judged against
    // positions as of this step.
    let obstacles: Vec<(u8, Rect)> = tanks.iter().map(|t| (t.id, t.hitbox())).collect();

    for tank in tanks.iter_mut() {
        let shooter_id = tank.id;
        // Drain-and-requeue pass: every live bullet is popped exactly once,
        // so no removal cause can fire twice for the same slot.
        for _ in 0..tank.bullets.len() {
            let Some(mut bullet) = tank.bullets.dequeue() else {
                break;
            };

            if now.duration_since(bullet.created_at) >= cfg.bullet.lifetime {
                continue;
            }

            let (nx, ny) = advance(bullet.x, bullet.y, bullet.angle, cfg.bullet.speed);
            let next_box = Rect::new(nx, ny, cfg.bullet.size, cfg.bullet.size);

            if let Some(target_id) =
                collision::first_overlapping_tank(&next_box, shooter_id, &obstacles)
            {
                events.hits.push(HitReport {
                    target_id,
                    shooter_id,
                });
                continue;
            }

            if let Some(struck) = collision::grid_hit(&next_box, grid) {
                bounce::resolve(&mut bullet, struck, grid, cfg.bullet.speed, cfg.bullet.size);
                bullet.bounces += 1;
                if cfg
                    .bullet
                    .max_bounces
                    .is_some_and(|max| bullet.bounces > max)
                {
                    continue;
                }
            }

            // Commit travel with the possibly just-reflected heading.
            let (x, y) = advance(bullet.x, bullet.y, bullet.angle, cfg.bullet.speed);
            bullet.x = x;
            bullet.y = y;
            tank.bullets.enqueue(bullet);
        }
    }

    for hit in &events.hits {
        info!(
            target_id = hit.target_id,
            shooter_id = hit.shooter_id,
            "tank hit"
        );
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::TileGrid;
    use crate::domain::state::Tank;
    use std::time::Duration;

    fn world_with_tank(id: u8, x: f32, y: f32) -> World {
        let mut world = World::new(TileGrid::empty());
        world
            .tanks
            .add(Tank::new(id, x, y, &TankTuning::default()))
            .expect("add tank");
        world
    }

    #[test]
    fn when_fire_is_held_for_five_ticks_then_exactly_one_bullet_spawns() {
        let cfg = StepConfig::default();
        let mut world = world_with_tank(0, 100.0, 100.0);
        world.tanks.get_mut(0).expect("tank").intents.fire = true;

        let start = Instant::now();
        let mut fired = 0;
        for tick in 0..5 {
            let events = step(
                &mut world,
                Owned::All,
                start + Duration::from_millis(16 * tick),
                &cfg,
            );
            fired += events.fired.len();
        }

        assert_eq!(fired, 1);
        assert_eq!(world.tanks.get(0).expect("tank").bullets.len(), 1);
    }

    #[test]
    fn when_fire_is_released_and_pressed_again_then_a_second_bullet_spawns() {
        let cfg = StepConfig::default();
        let mut world = world_with_tank(0, 100.0, 100.0);
        let start = Instant::now();

        world.tanks.get_mut(0).expect("tank").intents.fire = true;
        step(&mut world, Owned::All, start, &cfg);
        world.tanks.get_mut(0).expect("tank").intents.fire = false;
        step(&mut world, Owned::All, start + Duration::from_millis(16), &cfg);
        world.tanks.get_mut(0).expect("tank").intents.fire = true;
        let events = step(&mut world, Owned::All, start + Duration::from_millis(32), &cfg);

        assert_eq!(events.fired.len(), 1);
        assert_eq!(world.tanks.get(0).expect("tank").bullets.len(), 2);
    }

    #[test]
    fn when_a_bullet_passes_its_lifetime_then_it_is_gone_on_the_next_step() {
        let cfg = StepConfig::default();
        let mut world = world_with_tank(0, 100.0, 100.0);
        world.tanks.get_mut(0).expect("tank").intents.fire = true;

        let start = Instant::now();
        step(&mut world, Owned::All, start, &cfg);

        // Still flying just under the limit.
        step(&mut world, Owned::All, start + Duration::from_millis(900), &cfg);
        assert_eq!(world.tanks.get(0).expect("tank").bullets.len(), 1);

        // Expired past it.
        step(&mut world, Owned::All, start + Duration::from_millis(1100), &cfg);
        assert_eq!(world.tanks.get(0).expect("tank").bullets.len(), 0);
    }

    #[test]
    fn when_a_bullet_reaches_another_tank_then_a_hit_is_reported_and_the_bullet_removed() {
        let cfg = StepConfig::default();
        let mut world = world_with_tank(0, 100.0, 200.0);
        world
            .tanks
            .add(Tank::new(1, 100.0, 150.0, &TankTuning::default()))
            .expect("add target");

        // Shooter faces up, straight at tank 1.
        world.tanks.get_mut(0).expect("tank").intents.fire = true;

        let start = Instant::now();
        step(&mut world, Owned::All, start, &cfg);

        let mut hit = None;
        for tick in 1..80 {
            let events = step(
                &mut world,
                Owned::All,
                start + Duration::from_millis(10 * tick),
                &cfg,
            );
            world.tanks.get_mut(0).expect("tank").intents.fire = false;
            if let Some(first) = events.hits.first() {
                hit = Some(*first);
                break;
            }
        }

        let hit = hit.expect("bullet should reach the target");
        assert_eq!(hit.target_id, 1);
        assert_eq!(hit.shooter_id, 0);
        assert_eq!(world.tanks.get(0).expect("tank").bullets.len(), 0);
    }

    #[test]
    fn when_a_client_owns_one_tank_then_only_that_tank_moves() {
        let cfg = StepConfig::default();
        let mut world = world_with_tank(3, 100.0, 100.0);
        world
            .tanks
            .add(Tank::new(7, 300.0, 300.0, &TankTuning::default()))
            .expect("add remote");

        for tank in world.tanks.iter_mut() {
            tank.intents.forward = true;
        }

        step(&mut world, Owned::One(3), Instant::now(), &cfg);

        assert_eq!(world.tanks.get(3).expect("own").y, 100.0 - cfg.tank.speed);
        assert_eq!(world.tanks.get(7).expect("remote").y, 300.0);
    }

    #[test]
    fn when_max_bounces_is_configured_then_a_bullet_dies_on_the_extra_bounce() {
        let mut cfg = StepConfig::default();
        cfg.bullet.max_bounces = Some(0);
        let mut world = world_with_tank(0, 100.0, 100.0);
        // Box the tank in so the bullet must strike a wall quickly.
        let mut grid = TileGrid::empty();
        for col in 0..crate::domain::grid::GRID_COLS {
            grid.set_wall(col, 7, true);
        }
        world.grid = grid;
        world.tanks.get_mut(0).expect("tank").intents.fire = true;

        let start = Instant::now();
        step(&mut world, Owned::All, start, &cfg);
        assert_eq!(world.tanks.get(0).expect("tank").bullets.len(), 1);

        for tick in 1..40 {
            step(
                &mut world,
                Owned::All,
                start + Duration::from_millis(10 * tick),
                &cfg,
            );
        }
        assert_eq!(world.tanks.get(0).expect("tank").bullets.len(), 0);
    }
}
