// Gameplay tuning, grouped by entity kind.

pub mod bullet;
pub mod tank;
