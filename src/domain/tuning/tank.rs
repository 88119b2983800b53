/// Gameplay tuning for player tanks.
///
/// Keep this separate from runtime/server configuration (tick rates,
/// channel capacities, etc.).

#[derive(Debug, Clone, Copy)]
pub struct TankTuning {
    /// Travel speed in pixels per tick.
    pub speed: f32,

    /// Rotation step in degrees per tick.
    pub turn_step: i16,

    /// Collision footprint in pixels.
    pub width: f32,
    pub height: f32,
}

impl Default for TankTuning {
    fn default() -> Self {
        Self {
            speed: 3.0,
            turn_step: 3,
            width: 24.0,
            height: 24.0,
        }
    }
}
