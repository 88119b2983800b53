// The joining session role: replicates host output into a local world,
// simulates only the locally controlled tank (plus predicted self-fire),
// and reports intent flags back every tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Notify, mpsc};
use tracing::{debug, info, warn};

use crate::domain::bullets::Bullet;
use crate::domain::ports::{InputSource, RenderSink};
use crate::domain::state::{Intents, Tank, TankSnapshot, World};
use crate::domain::systems::step::{Owned, StepConfig, step};
use crate::use_cases::types::{HostEvent, SessionStart};

#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    pub tick_interval: Duration,
    pub step: StepConfig,
}

/// Applies one replicated host event to the local world. Remote tanks are
/// driven entirely by this path; the locally controlled tank is skipped so
/// prediction is never clobbered mid-tick. Duplicates and unknown ids are
/// expected under this protocol and never fatal.
pub fn apply_host_event(world: &mut World, local_id: u8, event: HostEvent, cfg: &StepConfig) {
    match event {
        HostEvent::Welcome { id } => {
            // Identity is fixed during the join handshake.
            debug!(id, "welcome after handshake ignored");
        }
        HostEvent::Roster(snapshots) => {
            for snapshot in &snapshots {
                if snapshot.id == local_id {
                    continue;
                }
                upsert_tank(world, snapshot, cfg);
            }
        }
        HostEvent::MapTransfer(grid) => {
            world.grid = grid;
        }
        HostEvent::StateSync(snapshots) => {
            // Last received wins; stale frames are superseded, not merged.
            for snapshot in &snapshots {
                if snapshot.id == local_id {
                    continue;
                }
                upsert_tank(world, snapshot, cfg);
            }
        }
        HostEvent::PlayerJoined { id, x, y } => {
            if world.tanks.get(id).is_some() {
                // Already known from the private roster; broadcast copy is
                // deduplicated by id.
                debug!(id, "duplicate join notification ignored");
                return;
            }
            let snapshot = TankSnapshot { id, x, y, angle: 0 };
            upsert_tank(world, &snapshot, cfg);
        }
        HostEvent::PlayerLeft { id } => {
            if id == local_id {
                warn!("host removed the local tank");
            }
            if world.tanks.remove(id).is_err() {
                debug!(id, "leave for unknown player ignored");
            }
        }
        HostEvent::BulletFired {
            owner_id,
            x,
            y,
            angle,
        } => {
            if owner_id == local_id {
                // Our own shot was already predicted locally.
                return;
            }
            match world.tanks.get_mut(owner_id) {
                Some(tank) => tank
                    .bullets
                    .enqueue(Bullet::new(x, y, angle, Instant::now())),
                None => debug!(owner_id, "bullet for unknown player ignored"),
            }
        }
        HostEvent::PlayerHit {
            target_id,
            shooter_id,
        } => {
            // Informational only; there is no damage model.
            info!(target_id, shooter_id, "hit confirmed by host");
        }
    }
}

fn upsert_tank(world: &mut World, snapshot: &TankSnapshot, cfg: &StepConfig) {
    match world.tanks.get_mut(snapshot.id) {
        Some(tank) => {
            tank.x = snapshot.x;
            tank.y = snapshot.y;
            tank.angle = snapshot.angle;
        }
        None => {
            let mut tank = Tank::new(snapshot.id, snapshot.x, snapshot.y, &cfg.tank);
            tank.angle = snapshot.angle;
            if world.tanks.add(tank).is_err() {
                warn!(id = snapshot.id, "replicated tank dropped; registry full");
            }
        }
    }
}

/// The client's fixed-tick loop, mirroring the host's iteration order:
/// drain replicated events, sample input, step owned state, present, send.
pub async fn session_task(
    start: SessionStart,
    mut inbound_rx: mpsc::Receiver<HostEvent>,
    intents_tx: mpsc::Sender<Intents>,
    mut input: Box<dyn InputSource>,
    mut render: Box<dyn RenderSink>,
    settings: ClientSettings,
    shutdown: Arc<Notify>,
) {
    let SessionStart {
        local_id,
        mut world,
    } = start;
    let mut interval = tokio::time::interval(settings.tick_interval);

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = interval.tick() => {}
        }

        loop {
            match inbound_rx.try_recv() {
                Ok(event) => apply_host_event(&mut world, local_id, event, &settings.step),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    info!("host connection closed; ending session");
                    return;
                }
            }
        }

        let intents = input.poll();
        if let Some(tank) = world.tanks.get_mut(local_id) {
            tank.intents = intents;
        }

        // Local prediction: our own movement and fire; every queue ages.
        let _events = step(&mut world, Owned::One(local_id), Instant::now(), &settings.step);

        render.present(&world);

        match intents_tx.try_send(intents) {
            Ok(()) => {}
            // Best-effort class: a backed-up writer drops this tick's
            // frame; the next full-state frame supersedes it.
            Err(mpsc::error::TrySendError::Full(_)) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("intent channel closed; ending session");
                return;
            }
        }
    }

    info!("session task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::TileGrid;

    const LOCAL_ID: u8 = 3;

    fn client_world() -> World {
        let cfg = StepConfig::default();
        let mut world = World::new(TileGrid::empty());
        world
            .tanks
            .add(Tank::new(LOCAL_ID, 100.0, 100.0, &cfg.tank))
            .expect("add local tank");
        world
    }

    #[test]
    fn when_state_sync_arrives_then_remote_tanks_update_and_local_is_untouched() {
        let cfg = StepConfig::default();
        let mut world = client_world();

        let event = HostEvent::StateSync(vec![
            TankSnapshot {
                id: LOCAL_ID,
                x: 555.0,
                y: 555.0,
                angle: 180,
            },
            TankSnapshot {
                id: 7,
                x: 200.0,
                y: 220.0,
                angle: 90,
            },
        ]);
        apply_host_event(&mut world, LOCAL_ID, event, &cfg);

        let local = world.tanks.get(LOCAL_ID).expect("local");
        assert_eq!((local.x, local.y, local.angle), (100.0, 100.0, 0));

        // Previously-unknown remote id is created from the keyed state.
        let remote = world.tanks.get(7).expect("remote");
        assert_eq!((remote.x, remote.y, remote.angle), (200.0, 220.0, 90));
    }

    #[test]
    fn when_a_join_notification_duplicates_the_roster_then_it_is_ignored() {
        let cfg = StepConfig::default();
        let mut world = client_world();

        apply_host_event(
            &mut world,
            LOCAL_ID,
            HostEvent::PlayerJoined {
                id: 7,
                x: 50.0,
                y: 60.0,
            },
            &cfg,
        );
        apply_host_event(
            &mut world,
            LOCAL_ID,
            HostEvent::PlayerJoined {
                id: 7,
                x: 999.0,
                y: 999.0,
            },
            &cfg,
        );

        let remote = world.tanks.get(7).expect("remote");
        assert_eq!((remote.x, remote.y), (50.0, 60.0));
        assert_eq!(world.tanks.len(), 2);
    }

    #[test]
    fn when_a_bullet_echo_names_the_local_tank_then_it_is_dropped() {
        let cfg = StepConfig::default();
        let mut world = client_world();

        apply_host_event(
            &mut world,
            LOCAL_ID,
            HostEvent::BulletFired {
                owner_id: LOCAL_ID,
                x: 110.0,
                y: 110.0,
                angle: 0,
            },
            &cfg,
        );

        assert_eq!(world.tanks.get(LOCAL_ID).expect("local").bullets.len(), 0);
    }

    #[test]
    fn when_a_remote_bullet_arrives_then_it_joins_the_owner_queue() {
        let cfg = StepConfig::default();
        let mut world = client_world();
        world
            .tanks
            .add(Tank::new(7, 300.0, 300.0, &cfg.tank))
            .expect("add remote");

        apply_host_event(
            &mut world,
            LOCAL_ID,
            HostEvent::BulletFired {
                owner_id: 7,
                x: 310.0,
                y: 310.0,
                angle: 45,
            },
            &cfg,
        );

        assert_eq!(world.tanks.get(7).expect("remote").bullets.len(), 1);
    }

    #[test]
    fn when_a_leave_names_an_unknown_id_then_the_world_is_unchanged() {
        let cfg = StepConfig::default();
        let mut world = client_world();

        apply_host_event(&mut world, LOCAL_ID, HostEvent::PlayerLeft { id: 99 }, &cfg);

        assert_eq!(world.tanks.len(), 1);
    }
}
