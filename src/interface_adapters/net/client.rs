// Client-side network adapter: bounded join handshake, then a reader task
// lifting wire frames into host events and a writer task flushing intent
// frames.

use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::domain::grid::TileGrid;
use crate::domain::state::{Intents, Tank, TankSnapshot, World};
use crate::domain::tuning::tank::TankTuning;
use crate::interface_adapters::protocol::{
    ClientPacket, HostPacket, RosterEntry, decode_host, encode_client,
};
use crate::use_cases::types::{HostEvent, SessionStart};

/// Events buffered per session; a session's traffic is tiny compared to
/// this, so hitting the cap means the consumer died.
const INBOUND_CAPACITY: usize = 1024;
const OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug)]
pub enum ConnectError {
    Ws(tungstenite::Error),
    /// The bounded handshake window expired.
    Timeout,
    /// The host refused the join (e.g. "server full").
    Rejected(String),
    /// The socket ended before identity, roster, and map all arrived.
    HandshakeIncomplete,
}

impl From<tungstenite::Error> for ConnectError {
    fn from(e: tungstenite::Error) -> Self {
        ConnectError::Ws(e)
    }
}

/// Channel pair a running session uses to talk to the host.
pub struct HostLink {
    pub inbound_rx: mpsc::Receiver<HostEvent>,
    pub intents_tx: mpsc::Sender<Intents>,
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects and completes the join handshake within one bounded window;
/// this is the only blocking wait in the client's lifetime. On success the
/// socket is handed to background reader/writer tasks.
pub async fn connect(
    url: &str,
    handshake_timeout: Duration,
    tank_cfg: &TankTuning,
) -> Result<(SessionStart, HostLink), ConnectError> {
    let deadline = Instant::now() + handshake_timeout;

    let (mut stream, _response) = timeout(handshake_timeout, connect_async(url))
        .await
        .map_err(|_| ConnectError::Timeout)??;

    let remaining = deadline.saturating_duration_since(Instant::now());
    let handshake = timeout(remaining, read_handshake(&mut stream))
        .await
        .map_err(|_| ConnectError::Timeout)??;

    let mut world = World::new(handshake.map);
    for snapshot in &handshake.roster {
        let mut tank = Tank::new(snapshot.id, snapshot.x, snapshot.y, tank_cfg);
        tank.angle = snapshot.angle;
        if world.tanks.add(tank).is_err() {
            warn!(id = snapshot.id, "roster tank dropped; registry full");
        }
    }
    info!(player_id = handshake.local_id, "join handshake complete");

    let (inbound_tx, inbound_rx) = mpsc::channel::<HostEvent>(INBOUND_CAPACITY);
    let (intents_tx, intents_rx) = mpsc::channel::<Intents>(OUTBOUND_CAPACITY);

    let (sink, source) = stream.split();
    tokio::spawn(read_task(source, inbound_tx, handshake.pending));
    tokio::spawn(write_task(sink, intents_rx));

    Ok((
        SessionStart {
            local_id: handshake.local_id,
            world,
        },
        HostLink {
            inbound_rx,
            intents_tx,
        },
    ))
}

struct Handshake {
    local_id: u8,
    roster: Vec<TankSnapshot>,
    map: TileGrid,
    /// Frames that raced ahead of the handshake trio; replayed in order
    /// once the session loop starts.
    pending: Vec<HostEvent>,
}

async fn read_handshake(stream: &mut WsStream) -> Result<Handshake, ConnectError> {
    let mut local_id = None;
    let mut roster = None;
    let mut map = None;
    let mut pending = Vec::new();

    while local_id.is_none() || roster.is_none() || map.is_none() {
        let Some(message) = stream.next().await else {
            return Err(ConnectError::HandshakeIncomplete);
        };
        match message? {
            Message::Binary(data) => match decode_host(&data) {
                Ok(HostPacket::Welcome { id }) => local_id = Some(id),
                Ok(HostPacket::Roster(entries)) => {
                    roster = Some(entries.iter().map(roster_snapshot).collect())
                }
                Ok(HostPacket::Map(grid)) => map = Some(grid),
                Ok(other) => pending.push(lift(other)),
                Err(e) => debug!(error = ?e, "invalid frame during handshake ignored"),
            },
            Message::Close(frame) => {
                let reason = frame
                    .map(|f| f.reason.as_str().to_string())
                    .unwrap_or_default();
                return Err(ConnectError::Rejected(reason));
            }
            _ => {}
        }
    }

    Ok(Handshake {
        local_id: local_id.unwrap_or_default(),
        roster: roster.unwrap_or_default(),
        map: map.unwrap_or_else(TileGrid::empty),
        pending,
    })
}

fn roster_snapshot(entry: &RosterEntry) -> TankSnapshot {
    TankSnapshot {
        id: entry.id,
        x: f32::from(entry.x),
        y: f32::from(entry.y),
        angle: 0,
    }
}

/// Lifts a decoded host packet out of wire representation.
fn lift(packet: HostPacket) -> HostEvent {
    match packet {
        HostPacket::Welcome { id } => HostEvent::Welcome { id },
        HostPacket::Roster(entries) => {
            HostEvent::Roster(entries.iter().map(roster_snapshot).collect())
        }
        HostPacket::Map(grid) => HostEvent::MapTransfer(grid),
        HostPacket::State(entries) => HostEvent::StateSync(
            entries
                .iter()
                .map(|e| TankSnapshot {
                    id: e.id,
                    x: f32::from(e.x),
                    y: f32::from(e.y),
                    angle: e.angle,
                })
                .collect(),
        ),
        HostPacket::PlayerJoined { id, x, y } => HostEvent::PlayerJoined {
            id,
            x: f32::from(x),
            y: f32::from(y),
        },
        HostPacket::PlayerLeft { id } => HostEvent::PlayerLeft { id },
        HostPacket::NewBullet {
            owner_id,
            x,
            y,
            angle,
        } => HostEvent::BulletFired {
            owner_id,
            x: f32::from(x),
            y: f32::from(y),
            angle,
        },
        HostPacket::PlayerHit {
            target_id,
            shooter_id,
        } => HostEvent::PlayerHit {
            target_id,
            shooter_id,
        },
    }
}

async fn read_task(
    mut source: futures_util::stream::SplitStream<WsStream>,
    inbound_tx: mpsc::Sender<HostEvent>,
    pending: Vec<HostEvent>,
) {
    for event in pending {
        if inbound_tx.send(event).await.is_err() {
            return;
        }
    }

    while let Some(message) = source.next().await {
        match message {
            Ok(Message::Binary(data)) => match decode_host(&data) {
                Ok(packet) => {
                    if inbound_tx.send(lift(packet)).await.is_err() {
                        // Session loop ended; nothing left to feed.
                        return;
                    }
                }
                // Soft failure: a malformed frame is superseded by the
                // next full-state broadcast.
                Err(e) => debug!(error = ?e, "invalid frame from host ignored"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "websocket recv error");
                break;
            }
        }
    }
    info!("host stream ended");
    // Dropping inbound_tx tells the session loop the host is gone.
}

async fn write_task(
    mut sink: futures_util::stream::SplitSink<WsStream, Message>,
    mut intents_rx: mpsc::Receiver<Intents>,
) {
    while let Some(intents) = intents_rx.recv().await {
        let frame = encode_client(&ClientPacket::State(intents));
        if let Err(e) = sink.send(Message::Binary(Bytes::from(frame))).await {
            warn!(error = %e, "failed to send intent frame; stopping writer");
            break;
        }
    }
}
