use std::{env, time::Duration};

use crate::domain::grid::DEFAULT_WALL_DENSITY;

// Runtime/server constants (not gameplay tuning).

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const UPDATE_BROADCAST_CAPACITY: usize = 128;
// Each update fans out into several frames, so this runs deeper.
pub const FRAME_BROADCAST_CAPACITY: usize = 512;

pub const TICK_INTERVAL: Duration = Duration::from_millis(16);

// Bounded wait covering connect plus the join handshake; the only place
// the client blocks.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn host_port() -> u16 {
    env::var("TANK_ARENA_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1234)
}

pub fn server_url() -> String {
    env::var("TANK_ARENA_SERVER").unwrap_or_else(|_| "ws://127.0.0.1:1234/ws".to_string())
}

/// Bounce cap for bullets; unset or 0 means unlimited.
pub fn max_bullet_bounces() -> Option<u32> {
    env::var("TANK_ARENA_MAX_BOUNCES")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|max| *max > 0)
}

/// Interior wall probability for generated maps, clamped to keep the field
/// playable.
pub fn wall_density() -> f32 {
    env::var("TANK_ARENA_WALL_DENSITY")
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .map(|density| density.clamp(0.0, 0.5))
        .unwrap_or(DEFAULT_WALL_DENSITY)
}
