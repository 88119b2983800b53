// Host-side network adapter: one task per client socket, bridging the
// binary wire protocol to the world task's event channel and frame
// broadcasts.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use futures::SinkExt;
use tokio::sync::watch::Receiver as WatchReceiver;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, info_span, warn};

use crate::interface_adapters::protocol::{
    ClientPacket, HostPacket, RosterEntry, decode_client, encode_host,
};
use crate::use_cases::types::{GameEvent, JoinAccepted, JoinRejected, WorldUpdate};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    InputClosed,
    FramesClosed,
    SessionFull,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Clone)]
pub struct AppState {
    // Inputs flowing from connections into the world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    // World updates produced by the world task (domain structs).
    pub update_tx: broadcast::Sender<WorldUpdate>,
    // Encoded frames, shared across all connections.
    pub frames_tx: broadcast::Sender<Bytes>,
    // Latest encoded roster for lag recovery.
    pub roster_tx: watch::Sender<Bytes>,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_FRAMES: u32 = 10;

fn next_conn_id() -> u64 {
    // Correlates log lines before a player_id exists.
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let conn_id = next_conn_id();
    let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
    let _enter = span.enter();

    let mut ctx = match bootstrap_connection(&mut socket, &state).await {
        Ok(ctx) => ctx,
        Err(NetError::SessionFull) => {
            info!("join rejected; session full");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "server full".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
        Err(e) => {
            warn!(error = ?e, "failed to bootstrap connection");
            let _ = socket.close().await;
            return;
        }
    };

    span.record("player_id", u64::from(ctx.player_id));
    info!("client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }

    // Explicitly unmap this peer from its entity; the world compacts and
    // broadcasts the leave.
    if state
        .input_tx
        .send(GameEvent::Leave {
            player_id: ctx.player_id,
        })
        .await
        .is_err()
    {
        warn!("world task gone before disconnect cleanup");
    }

    info!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_frames = ctx.invalid_frames,
        lag_resyncs = ctx.lag_resyncs,
        "client disconnected"
    );
}

struct ConnCtx {
    player_id: u8,
    input_tx: mpsc::Sender<GameEvent>,
    frames_rx: broadcast::Receiver<Bytes>,
    roster_rx: WatchReceiver<Bytes>,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_frames: u32,
    lag_resyncs: u64,

    last_invalid_frame_log: Instant,
    last_input_full_log: Instant,
    last_frame_lag_log: Instant,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
) -> Result<ConnCtx, NetError> {
    // Subscribe to frames *before* doing anything else (awaits) to not miss
    // a broadcast between admission and the loop.
    let frames_rx = state.frames_tx.subscribe();
    let roster_rx = state.roster_tx.subscribe();

    // Admission: the world task assigns the id and spawns the tank, or
    // rejects the join outright.
    let (reply_tx, reply_rx) = oneshot::channel();
    state
        .input_tx
        .send(GameEvent::Join { reply: reply_tx })
        .await
        .map_err(|_| NetError::InputClosed)?;
    let JoinAccepted {
        player_id,
        roster,
        map,
    } = match reply_rx.await {
        Ok(Ok(accepted)) => accepted,
        Ok(Err(JoinRejected::SessionFull)) => return Err(NetError::SessionFull),
        Err(_) => return Err(NetError::InputClosed),
    };

    // Reliable unicast handshake: identity, roster, then the map. If any
    // send fails, compensate with Leave so no tank outlives a connection
    // that never finished joining.
    let entries: Vec<RosterEntry> = roster.iter().map(RosterEntry::from).collect();
    let handshake = [
        encode_host(&HostPacket::Welcome { id: player_id }),
        encode_host(&HostPacket::Roster(entries)),
        encode_host(&HostPacket::Map(map)),
    ];
    let mut bytes_out = 0u64;
    for frame in handshake {
        bytes_out += frame.len() as u64;
        if let Err(e) = socket.send(Message::Binary(Bytes::from(frame))).await {
            state
                .input_tx
                .send(GameEvent::Leave { player_id })
                .await
                .map_err(|_| NetError::InputClosed)?;
            return Err(NetError::Ws(e));
        }
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        input_tx: state.input_tx.clone(),
        frames_rx,
        roster_rx,

        msgs_in: 0,
        msgs_out: 3,
        bytes_in: 0,
        bytes_out,
        invalid_frames: 0,
        lag_resyncs: 0,

        last_invalid_frame_log: now,
        last_input_full_log: now,
        last_frame_lag_log: now,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        input_tx,
        frames_rx,
        roster_rx,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_frames,
        lag_resyncs,
        last_invalid_frame_log,
        last_input_full_log,
        last_frame_lag_log,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            // Incoming intent frame from the client.
            incoming = socket.recv() => {
                match handle_incoming(
                    incoming,
                    player_id,
                    input_tx,
                    msgs_in,
                    bytes_in,
                    invalid_frames,
                    last_invalid_frame_log,
                    last_input_full_log,
                ) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing broadcast frame.
            frame = frames_rx.recv() => {
                match frame {
                    Ok(bytes) => {
                        *msgs_out += 1;
                        *bytes_out += bytes.len() as u64;
                        socket.send(Message::Binary(bytes)).await.is_err()
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_frame_lag_log) {
                            warn!(missed = n, "frames lagged; resyncing roster");
                        }
                        // Resync strategy: the skipped per-tick frames are
                        // superseded by the latest roster snapshot; the next
                        // STATE broadcast completes the repair.
                        *lag_resyncs += 1;
                        let latest = roster_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            *msgs_out += 1;
                            *bytes_out += latest.len() as u64;
                            socket.send(Message::Binary(latest)).await.is_err()
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::FramesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            let _ = socket.close().await;
            break;
        }

        if *invalid_frames >= MAX_INVALID_FRAMES {
            warn!("too many invalid frames; closing connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "invalid frames".into(),
                })))
                .await;
            let _ = socket.close().await;
            break;
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn handle_incoming(
    incoming: Option<Result<Message, axum::Error>>,
    player_id: u8,
    input_tx: &mpsc::Sender<GameEvent>,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_frames: &mut u32,
    last_invalid_frame_log: &mut Instant,
    last_input_full_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(Message::Binary(data))) => {
            *msgs_in += 1;
            *bytes_in += data.len() as u64;
            match decode_client(&data) {
                Ok(ClientPacket::State(intents)) => {
                    match input_tx.try_send(GameEvent::Intents { player_id, intents }) {
                        Ok(()) => Ok(LoopControl::Continue),
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            // Best-effort class: drop; the client resends
                            // full intent state next tick anyway.
                            if should_log(last_input_full_log) {
                                warn!(player_id, "input channel full; dropping intents");
                            }
                            Ok(LoopControl::Continue)
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => Err(NetError::InputClosed),
                    }
                }
                Err(e) => {
                    *invalid_frames += 1;
                    if should_log(last_invalid_frame_log) {
                        warn!(player_id, error = ?e, "invalid frame from client");
                    }
                    Ok(LoopControl::Continue)
                }
            }
        }
        Some(Ok(Message::Text(_))) => {
            // The protocol is binary-only; count it as an invalid frame.
            *invalid_frames += 1;
            if should_log(last_invalid_frame_log) {
                warn!(player_id, "text frame from client ignored");
            }
            Ok(LoopControl::Continue)
        }
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => Ok(LoopControl::Continue),
        Some(Ok(Message::Close(_))) => Ok(LoopControl::Disconnect),
        Some(Err(e)) => {
            debug!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => Ok(LoopControl::Disconnect),
    }
}
