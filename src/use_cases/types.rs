// Use-case level inputs/outputs crossing the network boundary.

use tokio::sync::oneshot;

use crate::domain::grid::TileGrid;
use crate::domain::state::{Intents, TankSnapshot, World};
use crate::domain::systems::step::{BulletSpawn, HitReport};

/// Events flowing from connections into the authoritative world task.
#[derive(Debug)]
pub enum GameEvent {
    Join {
        reply: oneshot::Sender<Result<JoinAccepted, JoinRejected>>,
    },
    Leave {
        player_id: u8,
    },
    Intents {
        player_id: u8,
        intents: Intents,
    },
}

/// Everything a freshly accepted connection needs for its reliable
/// handshake: its identity plus a roster/map snapshot taken after its own
/// tank was spawned.
#[derive(Debug)]
pub struct JoinAccepted {
    pub player_id: u8,
    pub roster: Vec<TankSnapshot>,
    pub map: TileGrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRejected {
    /// The registry is at capacity (or the id space is spent); the
    /// connection is refused before an entity exists.
    SessionFull,
}

/// One tick of authoritative output, broadcast to every connection.
#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub tanks: Vec<TankSnapshot>,
    pub joined: Vec<TankSnapshot>,
    pub left: Vec<u8>,
    pub fired: Vec<BulletSpawn>,
    pub hits: Vec<HitReport>,
}

/// Replicated host output as seen by the client role, already lifted out
/// of wire representation by the network adapter.
#[derive(Debug, Clone)]
pub enum HostEvent {
    Welcome { id: u8 },
    Roster(Vec<TankSnapshot>),
    MapTransfer(TileGrid),
    StateSync(Vec<TankSnapshot>),
    PlayerJoined { id: u8, x: f32, y: f32 },
    PlayerLeft { id: u8 },
    BulletFired { owner_id: u8, x: f32, y: f32, angle: i16 },
    PlayerHit { target_id: u8, shooter_id: u8 },
}

/// State a client session starts from once the join handshake completed.
pub struct SessionStart {
    pub local_id: u8,
    pub world: World,
}
