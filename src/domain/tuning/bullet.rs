/// Gameplay tuning for bullets.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BulletTuning {
    /// Travel speed in pixels per tick.
    pub speed: f32,

    /// Square footprint side in pixels. Must be even so the muzzle offset
    /// centers cleanly.
    pub size: f32,

    /// Wall-clock lifetime before a bullet expires.
    pub lifetime: Duration,

    /// Bounces allowed before a bullet is removed; `None` is unlimited.
    pub max_bounces: Option<u32>,
}

impl Default for BulletTuning {
    fn default() -> Self {
        Self {
            speed: 1.0,
            size: 4.0,
            lifetime: Duration::from_secs(1),
            max_bounces: None,
        }
    }
}
