// End-to-end session tests against a live host: join handshake, keyed
// state broadcasts, and structural join/leave events over the wire.

mod support;

use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use tank_arena::domain::grid::MAP_BYTES;
use tank_arena::domain::state::Intents;
use tank_arena::interface_adapters::protocol::{
    ClientPacket, HostPacket, decode_host, encode_client,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

async fn connect(url: &str) -> WsStream {
    let (stream, _response) = connect_async(url).await.expect("connect to test host");
    stream
}

// Next decoded host packet, skipping non-binary traffic.
async fn next_packet(stream: &mut WsStream) -> HostPacket {
    loop {
        let message = tokio::time::timeout(READ_TIMEOUT, stream.next())
            .await
            .expect("timed out waiting for a host frame")
            .expect("host stream ended")
            .expect("host stream error");
        if let Message::Binary(data) = message {
            return decode_host(&data).expect("valid host frame");
        }
    }
}

// Completes the join handshake and returns the assigned id.
async fn join(stream: &mut WsStream) -> u8 {
    let HostPacket::Welcome { id } = next_packet(stream).await else {
        panic!("expected welcome first");
    };

    let HostPacket::Roster(entries) = next_packet(stream).await else {
        panic!("expected roster second");
    };
    assert!(entries.iter().any(|e| e.id == id), "roster names the joiner");
    assert!(entries.iter().any(|e| e.id == 0), "roster names the host avatar");

    let HostPacket::Map(grid) = next_packet(stream).await else {
        panic!("expected map third");
    };
    assert_eq!(grid.as_bytes().len(), MAP_BYTES);

    id
}

async fn send_intents(stream: &mut WsStream, intents: Intents) {
    let frame = encode_client(&ClientPacket::State(intents));
    stream
        .send(Message::Binary(Bytes::from(frame)))
        .await
        .expect("send intent frame");
}

#[tokio::test]
async fn test_join_handshake_delivers_identity_roster_and_map() {
    let url = support::ensure_server();
    let mut stream = connect(url).await;

    let id = join(&mut stream).await;
    assert_ne!(id, 0, "id 0 is the host avatar");
}

#[tokio::test]
async fn test_state_broadcast_is_keyed_and_includes_every_tank() {
    let url = support::ensure_server();
    let mut stream = connect(url).await;
    let id = join(&mut stream).await;

    for _ in 0..200 {
        if let HostPacket::State(entries) = next_packet(&mut stream).await {
            assert!(entries.iter().any(|e| e.id == id), "own tank in state");
            assert!(entries.iter().any(|e| e.id == 0), "host tank in state");
            return;
        }
    }
    panic!("no state broadcast observed");
}

#[tokio::test]
async fn test_zero_intents_leave_the_tank_unmoved() {
    let url = support::ensure_server();
    let mut stream = connect(url).await;
    let id = join(&mut stream).await;

    send_intents(&mut stream, Intents::default()).await;

    let mut observed = Vec::new();
    for _ in 0..400 {
        if let HostPacket::State(entries) = next_packet(&mut stream).await {
            let own = entries
                .iter()
                .find(|e| e.id == id)
                .copied()
                .expect("own tank in state");
            observed.push(own);
            if observed.len() == 3 {
                break;
            }
            send_intents(&mut stream, Intents::default()).await;
        }
    }

    assert_eq!(observed.len(), 3, "expected three state samples");
    for sample in &observed[1..] {
        assert_eq!((sample.x, sample.y, sample.angle), (
            observed[0].x,
            observed[0].y,
            observed[0].angle,
        ));
    }
}

#[tokio::test]
async fn test_join_and_leave_are_broadcast_to_other_peers() {
    let url = support::ensure_server();
    let mut watcher = connect(url).await;
    join(&mut watcher).await;

    let mut joiner = connect(url).await;
    let joiner_id = join(&mut joiner).await;

    // The watcher hears about the new peer (other tests may join
    // concurrently, so skip unrelated traffic).
    let mut seen_join = false;
    for _ in 0..400 {
        if let HostPacket::PlayerJoined { id, .. } = next_packet(&mut watcher).await {
            if id == joiner_id {
                seen_join = true;
                break;
            }
        }
    }
    assert!(seen_join, "join was never broadcast");

    joiner.close(None).await.expect("close joiner");

    let mut seen_leave = false;
    for _ in 0..400 {
        if let HostPacket::PlayerLeft { id } = next_packet(&mut watcher).await {
            if id == joiner_id {
                seen_leave = true;
                break;
            }
        }
    }
    assert!(seen_leave, "leave was never broadcast");
}
