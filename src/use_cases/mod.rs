// Use cases layer: the two session roles and their boundary types.

pub mod client;
pub mod host;
pub mod types;

pub use types::{GameEvent, HostEvent, JoinAccepted, JoinRejected, SessionStart, WorldUpdate};
