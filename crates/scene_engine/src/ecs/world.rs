//! ECS World implementation
//!
//! The world owns every entity and component for one scene lifetime and runs
//! registered systems once per update pass.

use log::{debug, trace, warn};

use super::commands::{CommandQueue, Commands};
use super::entity::{EntityRecord, EntityStore};
use super::storage::{ComponentStorage, ComponentStore, Mut};
use super::{Component, EcsError, Entity, System};

/// ECS World containing all entities and components
#[derive(Default)]
pub struct World {
    entities: EntityStore,
    components: ComponentStore,
    systems: Vec<Box<dyn System>>,
    commands: CommandQueue,
    updating: bool,
    last_despawn: u64,
}

impl World {
    /// Create a new world
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new entity.
    ///
    /// Inside an update pass the id is reserved and becomes live when the pass
    /// completes; attach components to it through [`World::commands`].
    pub fn create_entity(&mut self, name: Option<&str>) -> Entity {
        if self.updating {
            return self.commands().spawn(name);
        }
        let entity = self.entities.create(name);
        trace!("Created entity {:?}", entity);
        entity
    }

    /// Destroy an entity and all of its components.
    ///
    /// Destroying an unknown or already destroyed entity is a no-op returning
    /// `false`. Inside an update pass the destruction is queued.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if self.updating {
            if !self.entities.is_allocated(entity) {
                return false;
            }
            self.commands().despawn(entity);
            return true;
        }
        if !self.entities.is_allocated(entity) {
            return false;
        }
        let removed = self.components.remove_all(entity);
        self.entities.destroy(entity);
        self.last_despawn = self.components.tick();
        trace!("Destroyed entity {:?} ({} components)", entity, removed);
        true
    }

    /// Look up a live entity
    pub fn entity(&self, entity: Entity) -> Option<&EntityRecord> {
        self.entities.get(entity)
    }

    /// Whether the entity is live
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Iterate over live entities in creation order
    pub fn entities(&self) -> impl Iterator<Item = (Entity, &EntityRecord)> {
        self.entities.iter()
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Enable or disable an entity. Returns `false` if it is not live.
    pub fn set_enabled(&mut self, entity: Entity, enabled: bool) -> bool {
        self.entities.set_enabled(entity, enabled)
    }

    /// Whether a live entity is enabled (`false` for dead ids)
    pub fn is_enabled(&self, entity: Entity) -> bool {
        self.entities.get(entity).is_some_and(|record| record.enabled)
    }

    /// Rename an entity. Returns `false` if it is not live.
    pub fn rename(&mut self, entity: Entity, name: impl Into<String>) -> bool {
        self.entities.rename(entity, name)
    }

    /// Add a component to an entity
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Result<(), EcsError> {
        self.components.add(&self.entities, entity, component)
    }

    /// Add or overwrite a component, returning the previous value
    pub fn replace_component<T: Component>(&mut self, entity: Entity, component: T) -> Result<Option<T>, EcsError> {
        self.components.replace(&self.entities, entity, component)
    }

    /// Get a component from an entity
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.components.get(entity)
    }

    /// Get a mutable component from an entity
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<Mut<'_, T>> {
        self.components.get_mut(entity)
    }

    /// Remove a component, returning it if it was attached
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.components.remove(entity)
    }

    /// Tags of every component attached to an entity
    pub fn component_names(&self, entity: Entity) -> Vec<&'static str> {
        self.components.component_names(entity)
    }

    /// Iterate `(entity, &T)` for every entity with a `T`
    pub fn query<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.components.iter::<T>()
    }

    /// Iterate `(entity, &A, &B)` for entities that have both components
    pub fn query_pair<A: Component, B: Component>(&self) -> impl Iterator<Item = (Entity, &A, &B)> {
        self.components
            .iter::<A>()
            .filter_map(move |(entity, a)| self.components.get::<B>(entity).map(|b| (entity, a, b)))
    }

    /// Raw storage for one component type, used for change detection
    pub fn storage<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        self.components.storage::<T>()
    }

    /// Entities whose `T` was written after `tick`
    pub fn changed_since<T: Component>(&self, tick: u64) -> Vec<Entity> {
        self.components
            .storage::<T>()
            .map(|storage| storage.changed_since(tick).collect())
            .unwrap_or_default()
    }

    /// Current change tick
    pub fn change_tick(&self) -> u64 {
        self.components.tick()
    }

    /// Change tick of the most recent entity destruction (0 if none)
    pub fn despawn_tick(&self) -> u64 {
        self.last_despawn
    }

    /// Queue structural changes to be applied at the next flush
    pub fn commands(&mut self) -> Commands<'_> {
        Commands::new(&mut self.entities, &mut self.commands)
    }

    /// Register a system; systems run in registration order
    pub fn add_system(&mut self, system: impl System + 'static) {
        debug!("Registered system '{}'", system.name());
        self.systems.push(Box::new(system));
    }

    /// Run one update pass.
    ///
    /// Pending changes are applied first, then every system runs, then the
    /// changes queued during the pass are applied. Negative or non-finite
    /// deltas are clamped to zero.
    pub fn update(&mut self, delta_time: f32) {
        let delta_time = if delta_time >= 0.0 && delta_time.is_finite() {
            delta_time
        } else {
            warn!("World::update called with invalid delta {}, using 0", delta_time);
            0.0
        };

        self.flush();
        self.updating = true;

        let mut systems = std::mem::take(&mut self.systems);
        for system in &mut systems {
            trace!("Running system '{}'", system.name());
            system.run(self, delta_time);
        }
        // Systems registered during the pass run from the next update on
        systems.append(&mut self.systems);
        self.systems = systems;

        self.updating = false;
        self.flush();
    }

    /// Apply every queued command now
    pub fn flush(&mut self) {
        while !self.commands.is_empty() {
            let mut queue = std::mem::take(&mut self.commands);
            queue.apply(self);
        }
    }

    pub(crate) fn activate_reserved(&mut self, entity: Entity) {
        if !self.entities.activate(entity) {
            trace!("Reserved entity {:?} was already live or destroyed", entity);
        }
    }
}
