//! Deferred world mutation
//!
//! Systems run while the world is being iterated, so structural changes made
//! during an update pass (spawning, despawning, attaching components to a
//! freshly spawned entity) are recorded here and applied once the pass ends.

use log::warn;

use super::entity::EntityStore;
use super::{Component, Entity, World};

/// A queue of operations to be performed on a [`World`]
#[derive(Default)]
pub struct CommandQueue {
    inner: Vec<Box<dyn FnOnce(&mut World) + Send>>,
}

impl CommandQueue {
    /// Create a new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an operation to the end of the queue
    pub fn push(&mut self, f: impl FnOnce(&mut World) + Send + 'static) {
        self.inner.push(Box::new(f));
    }

    /// Number of queued operations
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Apply queued operations in order, draining the queue
    pub fn apply(&mut self, world: &mut World) {
        for command in self.inner.drain(..) {
            command(world);
        }
    }
}

/// Borrowed handle for queueing changes against a world.
///
/// Ids returned by [`Commands::spawn`] are usable immediately for further
/// commands; the entity becomes live when the queue is applied.
pub struct Commands<'w> {
    entities: &'w mut EntityStore,
    queue: &'w mut CommandQueue,
}

impl<'w> Commands<'w> {
    pub(crate) fn new(entities: &'w mut EntityStore, queue: &'w mut CommandQueue) -> Self {
        Self { entities, queue }
    }

    /// Reserve an entity that goes live when the queue is applied
    pub fn spawn(&mut self, name: Option<&str>) -> Entity {
        let entity = self.entities.reserve(name);
        self.queue.push(move |world| world.activate_reserved(entity));
        entity
    }

    /// Attach a component once the queue is applied
    pub fn insert<T: Component>(&mut self, entity: Entity, component: T) -> &mut Self {
        self.queue.push(move |world| {
            if let Err(err) = world.add_component(entity, component) {
                warn!("Deferred insert of {} skipped: {}", T::NAME, err);
            }
        });
        self
    }

    /// Detach a component once the queue is applied
    pub fn remove<T: Component>(&mut self, entity: Entity) -> &mut Self {
        self.queue.push(move |world| {
            world.remove_component::<T>(entity);
        });
        self
    }

    /// Destroy an entity once the queue is applied
    pub fn despawn(&mut self, entity: Entity) {
        self.queue.push(move |world| {
            world.destroy_entity(entity);
        });
    }

    /// Queue an arbitrary operation
    pub fn push(&mut self, f: impl FnOnce(&mut World) + Send + 'static) {
        self.queue.push(f);
    }
}
