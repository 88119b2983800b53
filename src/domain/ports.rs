// Ports for the collaborators the simulation core does not own.

use crate::domain::state::{Intents, World};

/// Source of already-debounced control intents for the locally controlled
/// tank, sampled once per tick.
pub trait InputSource: Send {
    fn poll(&mut self) -> Intents;
}

/// Sink that presents the world after each tick. Purely an output; nothing
/// it does feeds back into simulation state.
pub trait RenderSink: Send {
    fn present(&mut self, world: &World);
}
