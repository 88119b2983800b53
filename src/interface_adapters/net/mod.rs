// Network adapter modules split by host-side sockets vs the client
// connector, plus the shared frame serializer.

pub mod client;
pub mod frames;
pub mod host;

pub use client::{ConnectError, HostLink, connect};
pub use frames::frame_broadcaster;
pub use host::{AppState, ws_handler};
