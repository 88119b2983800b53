// Simulation systems: pure queries and per-tick state advancement.

pub mod bounce;
pub mod collision;
pub mod movement;
pub mod step;
