//! System trait and implementations

use super::World;

/// Per-frame logic operating over the world's components.
///
/// Systems run in registration order once per update pass. Structural changes
/// they make (spawning, destroying) are deferred until the pass completes.
pub trait System {
    /// Name used in log output
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Run the system for one frame
    fn run(&mut self, world: &mut World, delta_time: f32);
}

impl<F> System for F
where
    F: FnMut(&mut World, f32),
{
    fn name(&self) -> &str {
        "closure"
    }

    fn run(&mut self, world: &mut World, delta_time: f32) {
        self(world, delta_time);
    }
}

/// A system paired with a caller-chosen name
pub struct NamedSystem<S> {
    name: String,
    inner: S,
}

impl<S: System> NamedSystem<S> {
    /// Wrap `system` so it is logged as `name`
    pub fn new(name: impl Into<String>, system: S) -> Self {
        Self {
            name: name.into(),
            inner: system,
        }
    }
}

impl<S: System> System for NamedSystem<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, world: &mut World, delta_time: f32) {
        self.inner.run(world, delta_time);
    }
}
