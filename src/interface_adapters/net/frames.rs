// Serializes each world update once and shares the encoded frames with
// every connection task, so per-client work is just a socket write.

use bytes::Bytes;
use tokio::sync::{broadcast, watch};
use tracing::warn;

use crate::interface_adapters::protocol::{HostPacket, RosterEntry, TankWireState, encode_host};
use crate::use_cases::types::WorldUpdate;

pub async fn frame_broadcaster(
    mut update_rx: broadcast::Receiver<WorldUpdate>,
    frames_tx: broadcast::Sender<Bytes>,
    roster_tx: watch::Sender<Bytes>,
) {
    loop {
        match update_rx.recv().await {
            Ok(update) => {
                // Structural events first so a receiver always knows an id
                // before state or bullets reference it.
                for snapshot in &update.joined {
                    publish(
                        &frames_tx,
                        &HostPacket::PlayerJoined {
                            id: snapshot.id,
                            x: snapshot.x as u16,
                            y: snapshot.y as u16,
                        },
                    );
                }
                for id in &update.left {
                    publish(&frames_tx, &HostPacket::PlayerLeft { id: *id });
                }
                for spawn in &update.fired {
                    publish(
                        &frames_tx,
                        &HostPacket::NewBullet {
                            owner_id: spawn.owner_id,
                            x: spawn.x as u16,
                            y: spawn.y as u16,
                            angle: spawn.angle,
                        },
                    );
                }
                for hit in &update.hits {
                    publish(
                        &frames_tx,
                        &HostPacket::PlayerHit {
                            target_id: hit.target_id,
                            shooter_id: hit.shooter_id,
                        },
                    );
                }

                let state: Vec<TankWireState> =
                    update.tanks.iter().map(TankWireState::from).collect();
                publish(&frames_tx, &HostPacket::State(state));

                // Latest roster image doubles as the lag-recovery snapshot.
                let roster: Vec<RosterEntry> =
                    update.tanks.iter().map(RosterEntry::from).collect();
                let _ = roster_tx.send(Bytes::from(encode_host(&HostPacket::Roster(roster))));
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "frame broadcaster lagged; skipping to latest update");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("world updates channel closed; frame broadcaster exiting");
                break;
            }
        }
    }
}

fn publish(frames_tx: &broadcast::Sender<Bytes>, packet: &HostPacket) {
    // A send error only means no connection is subscribed right now.
    let _ = frames_tx.send(Bytes::from(encode_host(packet)));
}
