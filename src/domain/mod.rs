// Domain layer: core simulation types and rules.

pub mod bullets;
pub mod grid;
pub mod ports;
pub mod registry;
pub mod state;
pub mod systems;
pub mod tuning;

pub use bullets::{Bullet, BulletQueue};
pub use grid::TileGrid;
pub use registry::TankRegistry;
pub use state::{Intents, Tank, TankSnapshot, World};
