// Default collaborators for a headless process. A real front end supplies
// its own InputSource/RenderSink implementations through the same ports.

use crate::domain::ports::{InputSource, RenderSink};
use crate::domain::state::{Intents, World};

/// Produces no intents; the entity idles until a front end is attached.
pub struct NullInput;

impl InputSource for NullInput {
    fn poll(&mut self) -> Intents {
        Intents::default()
    }
}

/// Discards every presented frame.
pub struct HeadlessRender;

impl RenderSink for HeadlessRender {
    fn present(&mut self, _world: &World) {}
}
