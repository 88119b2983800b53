// The authoritative session role: owns the world, assigns entity ids, and
// runs the fixed-tick loop whose output every client replicates.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{Notify, broadcast, mpsc};
use tracing::{debug, error, info};

use crate::domain::grid::TileGrid;
use crate::domain::ports::{InputSource, RenderSink};
use crate::domain::state::{Intents, Tank, TankSnapshot, World};
use crate::domain::systems::step::{Owned, StepConfig, StepEvents, step};
use crate::use_cases::types::{GameEvent, JoinAccepted, JoinRejected, WorldUpdate};

#[derive(Debug, Clone, Copy)]
pub struct HostSettings {
    pub tick_interval: Duration,
    pub wall_density: f32,
    pub step: StepConfig,
}

/// Authoritative world plus the bookkeeping only the host performs:
/// monotonic id assignment and spawn placement.
pub struct HostWorld {
    world: World,
    /// Next id to hand out. Ids are never reused, even after a leave.
    next_id: u16,
    cfg: StepConfig,
    rng: StdRng,
}

impl HostWorld {
    pub fn new(cfg: StepConfig, wall_density: f32, mut rng: StdRng) -> Self {
        let grid = TileGrid::generate(&mut rng, wall_density);
        Self {
            world: World::new(grid),
            next_id: 0,
            cfg,
            rng,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Admits one participant: assigns the next id, spawns its tank at a
    /// random clear position, and returns the handshake snapshot (which
    /// already includes the new tank).
    pub fn accept_join(&mut self) -> Result<JoinAccepted, JoinRejected> {
        if self.world.tanks.is_full() || self.next_id > u16::from(u8::MAX) {
            return Err(JoinRejected::SessionFull);
        }
        let id = self.next_id as u8;

        let (x, y) = self
            .world
            .random_spawn(self.cfg.tank.width, self.cfg.tank.height, &mut self.rng);
        self.world
            .tanks
            .add(Tank::new(id, x, y, &self.cfg.tank))
            .map_err(|_| JoinRejected::SessionFull)?;
        self.next_id += 1;

        Ok(JoinAccepted {
            player_id: id,
            roster: self.snapshots(),
            map: self.world.grid.clone(),
        })
    }

    /// Returns false when the id is unknown (already-left peer; harmless).
    pub fn remove_player(&mut self, id: u8) -> bool {
        self.world.tanks.remove(id).is_ok()
    }

    /// Returns false when the id is unknown.
    pub fn set_intents(&mut self, id: u8, intents: Intents) -> bool {
        match self.world.tanks.get_mut(id) {
            Some(tank) => {
                tank.intents = intents;
                true
            }
            None => false,
        }
    }

    pub fn tick(&mut self, now: Instant) -> StepEvents {
        step(&mut self.world, Owned::All, now, &self.cfg)
    }

    pub fn snapshots(&self) -> Vec<TankSnapshot> {
        self.world.tanks.iter().map(TankSnapshot::from).collect()
    }
}

/// The host's fixed-tick loop. Each iteration drains pending network
/// events, samples local input, advances the simulation one step, presents
/// it, and publishes the resulting update.
pub async fn world_task(
    mut input_rx: mpsc::Receiver<GameEvent>,
    update_tx: broadcast::Sender<WorldUpdate>,
    mut input: Box<dyn InputSource>,
    mut render: Box<dyn RenderSink>,
    settings: HostSettings,
    shutdown: Arc<Notify>,
) {
    let mut host = HostWorld::new(settings.step, settings.wall_density, StdRng::from_os_rng());

    // The host's own avatar takes the first slot through the same admission
    // path as a network join.
    let local_id = match host.accept_join() {
        Ok(accepted) => accepted.player_id,
        Err(e) => {
            error!(error = ?e, "failed to spawn the host avatar");
            return;
        }
    };
    info!(player_id = local_id, "host avatar spawned");

    let mut tick: u64 = 0;
    let mut joined: Vec<TankSnapshot> = Vec::new();
    let mut left: Vec<u8> = Vec::new();
    let mut interval = tokio::time::interval(settings.tick_interval);

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = interval.tick() => {}
        }

        // Drain every pending event before simulating, so a step never
        // observes a half-applied batch.
        while let Ok(event) = input_rx.try_recv() {
            match event {
                GameEvent::Join { reply } => {
                    let result = host.accept_join();
                    if let Ok(accepted) = &result {
                        info!(player_id = accepted.player_id, "player joined");
                        let snapshot = accepted
                            .roster
                            .last()
                            .copied()
                            .expect("join snapshot includes the new tank");
                        joined.push(snapshot);
                    }
                    // A dropped receiver means the connection died mid-join;
                    // its Leave will follow through the same channel.
                    let _ = reply.send(result);
                }
                GameEvent::Leave { player_id } => {
                    if host.remove_player(player_id) {
                        info!(player_id, "player left");
                        left.push(player_id);
                    } else {
                        debug!(player_id, "leave for unknown player ignored");
                    }
                }
                GameEvent::Intents { player_id, intents } => {
                    if !host.set_intents(player_id, intents) {
                        debug!(player_id, "intents for unknown player ignored");
                    }
                }
            }
        }

        let intents = input.poll();
        host.set_intents(local_id, intents);

        let events = host.tick(Instant::now());

        render.present(host.world());

        tick += 1;
        let _ = update_tx.send(WorldUpdate {
            tick,
            tanks: host.snapshots(),
            joined: std::mem::take(&mut joined),
            left: std::mem::take(&mut left),
            fired: events.fired,
            hits: events.hits,
        });
    }

    info!("world task stopped");
}
