// Binary wire protocol between host and clients. Every message is one
// contiguous little-endian buffer starting with a one-byte discriminant;
// decoding validates the buffer length implied by the discriminant (and
// count field, where present) before reading any field.

use crate::domain::grid::{MAP_BYTES, TileGrid};
use crate::domain::state::{Intents, TankSnapshot};

pub const CLIENT_STATE: u8 = 0x00;
pub const HOST_WELCOME: u8 = 0x01;
pub const HOST_POSITION: u8 = 0x02;
pub const HOST_MAP: u8 = 0x03;
pub const HOST_STATE: u8 = 0x04;
pub const HOST_PLAYER_JOINED: u8 = 0x05;
pub const HOST_PLAYER_LEFT: u8 = 0x06;
pub const HOST_NEW_BULLET: u8 = 0x07;
pub const HOST_PLAYER_HIT: u8 = 0x08;

const ROSTER_ENTRY_BYTES: usize = 5;
const STATE_ENTRY_BYTES: usize = 7;

#[derive(Debug, PartialEq, Eq)]
pub enum WireError {
    Empty,
    UnknownKind(u8),
    BadLength {
        kind: u8,
        expected: usize,
        got: usize,
    },
}

/// Messages a client sends to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPacket {
    /// Full intent flag state for the sender's tank, sent every tick.
    State(Intents),
}

/// One roster element of a POSITION message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: u8,
    pub x: u16,
    pub y: u16,
}

impl From<&TankSnapshot> for RosterEntry {
    fn from(snapshot: &TankSnapshot) -> Self {
        Self {
            id: snapshot.id,
            x: snapshot.x as u16,
            y: snapshot.y as u16,
        }
    }
}

/// One element of a per-tick STATE broadcast, keyed by entity id so
/// receivers can never misapply state to the wrong tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TankWireState {
    pub id: u8,
    pub x: u16,
    pub y: u16,
    pub angle: i16,
}

impl From<&TankSnapshot> for TankWireState {
    fn from(snapshot: &TankSnapshot) -> Self {
        Self {
            id: snapshot.id,
            x: snapshot.x as u16,
            y: snapshot.y as u16,
            angle: snapshot.angle,
        }
    }
}

/// Messages the host sends to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum HostPacket {
    /// Assigned identity for the connection, unicast on join.
    Welcome { id: u8 },
    /// Roster snapshot, unicast on join and resent to lagging peers.
    Roster(Vec<RosterEntry>),
    /// The session map, unicast on join.
    Map(TileGrid),
    /// Per-tick full state broadcast.
    State(Vec<TankWireState>),
    PlayerJoined { id: u8, x: u16, y: u16 },
    PlayerLeft { id: u8 },
    NewBullet { owner_id: u8, x: u16, y: u16, angle: i16 },
    PlayerHit { target_id: u8, shooter_id: u8 },
}

pub fn encode_client(packet: &ClientPacket) -> Vec<u8> {
    match packet {
        ClientPacket::State(intents) => {
            let mut buf = Vec::with_capacity(7);
            buf.push(CLIENT_STATE);
            buf.push(u8::from(intents.forward));
            buf.push(u8::from(intents.backward));
            buf.push(u8::from(intents.turn_left));
            buf.push(u8::from(intents.turn_right));
            buf.push(u8::from(intents.fire));
            buf.push(u8::from(intents.fire_alt));
            buf
        }
    }
}

pub fn decode_client(data: &[u8]) -> Result<ClientPacket, WireError> {
    let kind = *data.first().ok_or(WireError::Empty)?;
    match kind {
        CLIENT_STATE => {
            expect_len(kind, 7, data.len())?;
            Ok(ClientPacket::State(Intents {
                forward: data[1] != 0,
                backward: data[2] != 0,
                turn_left: data[3] != 0,
                turn_right: data[4] != 0,
                fire: data[5] != 0,
                fire_alt: data[6] != 0,
            }))
        }
        other => Err(WireError::UnknownKind(other)),
    }
}

pub fn encode_host(packet: &HostPacket) -> Vec<u8> {
    match packet {
        HostPacket::Welcome { id } => vec![HOST_WELCOME, *id],
        HostPacket::Roster(entries) => {
            let mut buf = Vec::with_capacity(2 + entries.len() * ROSTER_ENTRY_BYTES);
            buf.push(HOST_POSITION);
            buf.push(entries.len() as u8);
            for entry in entries {
                buf.push(entry.id);
                buf.extend_from_slice(&entry.x.to_le_bytes());
                buf.extend_from_slice(&entry.y.to_le_bytes());
            }
            buf
        }
        HostPacket::Map(grid) => {
            let mut buf = Vec::with_capacity(1 + MAP_BYTES);
            buf.push(HOST_MAP);
            buf.extend_from_slice(grid.as_bytes());
            buf
        }
        HostPacket::State(entries) => {
            let mut buf = Vec::with_capacity(2 + entries.len() * STATE_ENTRY_BYTES);
            buf.push(HOST_STATE);
            buf.push(entries.len() as u8);
            for entry in entries {
                buf.push(entry.id);
                buf.extend_from_slice(&entry.x.to_le_bytes());
                buf.extend_from_slice(&entry.y.to_le_bytes());
                buf.extend_from_slice(&entry.angle.to_le_bytes());
            }
            buf
        }
        HostPacket::PlayerJoined { id, x, y } => {
            let mut buf = Vec::with_capacity(6);
            buf.push(HOST_PLAYER_JOINED);
            buf.push(*id);
            buf.extend_from_slice(&x.to_le_bytes());
            buf.extend_from_slice(&y.to_le_bytes());
            buf
        }
        HostPacket::PlayerLeft { id } => vec![HOST_PLAYER_LEFT, *id],
        HostPacket::NewBullet {
            owner_id,
            x,
            y,
            angle,
        } => {
            let mut buf = Vec::with_capacity(8);
            buf.push(HOST_NEW_BULLET);
            buf.push(*owner_id);
            buf.extend_from_slice(&x.to_le_bytes());
            buf.extend_from_slice(&y.to_le_bytes());
            buf.extend_from_slice(&angle.to_le_bytes());
            buf
        }
        HostPacket::PlayerHit {
            target_id,
            shooter_id,
        } => vec![HOST_PLAYER_HIT, *target_id, *shooter_id],
    }
}

pub fn decode_host(data: &[u8]) -> Result<HostPacket, WireError> {
    let kind = *data.first().ok_or(WireError::Empty)?;
    match kind {
        HOST_WELCOME => {
            expect_len(kind, 2, data.len())?;
            Ok(HostPacket::Welcome { id: data[1] })
        }
        HOST_POSITION => {
            let count = counted_len(kind, data, ROSTER_ENTRY_BYTES)?;
            let mut entries = Vec::with_capacity(count);
            for i in 0..count {
                let at = 2 + i * ROSTER_ENTRY_BYTES;
                entries.push(RosterEntry {
                    id: data[at],
                    x: read_u16(data, at + 1),
                    y: read_u16(data, at + 3),
                });
            }
            Ok(HostPacket::Roster(entries))
        }
        HOST_MAP => {
            expect_len(kind, 1 + MAP_BYTES, data.len())?;
            let grid = TileGrid::from_bytes(&data[1..]).map_err(|_| WireError::BadLength {
                kind,
                expected: 1 + MAP_BYTES,
                got: data.len(),
            })?;
            Ok(HostPacket::Map(grid))
        }
        HOST_STATE => {
            let count = counted_len(kind, data, STATE_ENTRY_BYTES)?;
            let mut entries = Vec::with_capacity(count);
            for i in 0..count {
                let at = 2 + i * STATE_ENTRY_BYTES;
                entries.push(TankWireState {
                    id: data[at],
                    x: read_u16(data, at + 1),
                    y: read_u16(data, at + 3),
                    angle: read_i16(data, at + 5),
                });
            }
            Ok(HostPacket::State(entries))
        }
        HOST_PLAYER_JOINED => {
            expect_len(kind, 6, data.len())?;
            Ok(HostPacket::PlayerJoined {
                id: data[1],
                x: read_u16(data, 2),
                y: read_u16(data, 4),
            })
        }
        HOST_PLAYER_LEFT => {
            expect_len(kind, 2, data.len())?;
            Ok(HostPacket::PlayerLeft { id: data[1] })
        }
        HOST_NEW_BULLET => {
            expect_len(kind, 8, data.len())?;
            Ok(HostPacket::NewBullet {
                owner_id: data[1],
                x: read_u16(data, 2),
                y: read_u16(data, 4),
                angle: read_i16(data, 6),
            })
        }
        HOST_PLAYER_HIT => {
            expect_len(kind, 3, data.len())?;
            Ok(HostPacket::PlayerHit {
                target_id: data[1],
                shooter_id: data[2],
            })
        }
        other => Err(WireError::UnknownKind(other)),
    }
}

fn expect_len(kind: u8, expected: usize, got: usize) -> Result<(), WireError> {
    if got != expected {
        return Err(WireError::BadLength {
            kind,
            expected,
            got,
        });
    }
    Ok(())
}

/// Validates a count-prefixed message body and returns the element count.
fn counted_len(kind: u8, data: &[u8], entry_bytes: usize) -> Result<usize, WireError> {
    let Some(count) = data.get(1) else {
        return Err(WireError::BadLength {
            kind,
            expected: 2,
            got: data.len(),
        });
    };
    let count = *count as usize;
    expect_len(kind, 2 + count * entry_bytes, data.len())?;
    Ok(count)
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn read_i16(data: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([data[at], data[at + 1]])
}
