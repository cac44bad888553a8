//! Entity implementation
//!
//! Entities are generational keys: destroying an entity frees its slot, and a
//! later entity reusing the slot gets a new generation, so stale handles held
//! by scene nodes or UI code observe "not found" instead of aliasing the new
//! entity.

use indexmap::IndexSet;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Entity identifier (slot index + generation)
    pub struct Entity;
}

/// Bookkeeping stored for every allocated entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    /// Display name
    pub name: String,
    /// Disabled entities keep their components but are not rendered
    pub enabled: bool,
    live: bool,
}

impl EntityRecord {
    fn new(name: String, live: bool) -> Self {
        Self { name, enabled: true, live }
    }
}

/// Owns entity identity and lifecycle
#[derive(Debug, Default)]
pub struct EntityStore {
    slots: SlotMap<Entity, EntityRecord>,
    // Live entities in the order they became live
    order: IndexSet<Entity>,
}

impl EntityStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh, live entity. Unnamed entities are called `Entity`.
    pub fn create(&mut self, name: Option<&str>) -> Entity {
        let entity = self.slots.insert(EntityRecord::new(name.unwrap_or("Entity").to_string(), true));
        self.order.insert(entity);
        entity
    }

    /// Allocate an id that does not become live until [`EntityStore::activate`].
    pub fn reserve(&mut self, name: Option<&str>) -> Entity {
        self.slots.insert(EntityRecord::new(name.unwrap_or("Entity").to_string(), false))
    }

    /// Make a reserved entity live. Returns `false` if the id is unknown or already live.
    pub fn activate(&mut self, entity: Entity) -> bool {
        match self.slots.get_mut(entity) {
            Some(record) if !record.live => {
                record.live = true;
                self.order.insert(entity);
                true
            }
            _ => false,
        }
    }

    /// Free an entity's slot. Destroying an unknown or already destroyed id
    /// is a no-op and returns `false`.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        match self.slots.remove(entity) {
            Some(record) => {
                if record.live {
                    self.order.shift_remove(&entity);
                }
                true
            }
            None => false,
        }
    }

    /// Look up a live entity
    pub fn get(&self, entity: Entity) -> Option<&EntityRecord> {
        self.slots.get(entity).filter(|record| record.live)
    }

    /// Whether the entity is allocated and live
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.get(entity).is_some()
    }

    /// Whether the id is allocated, live or reserved
    pub fn is_allocated(&self, entity: Entity) -> bool {
        self.slots.contains_key(entity)
    }

    /// Enable or disable a live entity. Returns `false` if it is not live.
    pub fn set_enabled(&mut self, entity: Entity, enabled: bool) -> bool {
        self.live_mut(entity).map(|record| record.enabled = enabled).is_some()
    }

    /// Rename a live entity. Returns `false` if it is not live.
    pub fn rename(&mut self, entity: Entity, name: impl Into<String>) -> bool {
        let name = name.into();
        self.live_mut(entity).map(|record| record.name = name).is_some()
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether there are no live entities
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate over live entities in the order they became live
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &EntityRecord)> {
        self.order.iter().filter_map(|&entity| self.slots.get(entity).map(|record| (entity, record)))
    }

    fn live_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        self.slots.get_mut(entity).filter(|record| record.live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_create_and_get() {
        let mut store = EntityStore::new();
        let player = store.create(Some("Player"));
        let unnamed = store.create(None);

        assert_eq!(store.get(player).map(|r| r.name.as_str()), Some("Player"));
        assert_eq!(store.get(unnamed).map(|r| r.name.as_str()), Some("Entity"));
        assert!(store.get(player).is_some_and(|r| r.enabled));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_destroyed_id_is_not_found_even_after_slot_reuse() {
        let mut store = EntityStore::new();
        let first = store.create(Some("first"));
        assert!(store.destroy(first));

        let second = store.create(Some("second"));
        assert_ne!(first, second);
        assert!(store.get(first).is_none());
        assert_eq!(store.get(second).map(|r| r.name.as_str()), Some("second"));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut store = EntityStore::new();
        let entity = store.create(None);
        assert!(store.destroy(entity));
        assert!(!store.destroy(entity));
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_live_ids_are_unique_across_churn() {
        let mut store = EntityStore::new();
        let mut live: Vec<Entity> = Vec::new();

        for round in 0..50 {
            live.push(store.create(None));
            live.push(store.create(None));
            if round % 3 == 0 {
                let victim = live.remove(round % live.len());
                store.destroy(victim);
            }
        }

        let unique: HashSet<_> = live.iter().copied().collect();
        assert_eq!(unique.len(), live.len());
        assert_eq!(store.len(), live.len());
        assert!(live.iter().all(|e| store.is_alive(*e)));
    }

    #[test]
    fn test_reserved_entity_is_hidden_until_activated() {
        let mut store = EntityStore::new();
        let entity = store.reserve(Some("pending"));

        assert!(store.is_allocated(entity));
        assert!(!store.is_alive(entity));
        assert_eq!(store.len(), 0);
        assert_eq!(store.iter().count(), 0);

        assert!(store.activate(entity));
        assert!(!store.activate(entity));
        assert!(store.is_alive(entity));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_rename_and_disable() {
        let mut store = EntityStore::new();
        let entity = store.create(None);
        assert!(store.rename(entity, "Renamed"));
        assert!(store.set_enabled(entity, false));

        let record = store.get(entity).unwrap();
        assert_eq!(record.name, "Renamed");
        assert!(!record.enabled);

        store.destroy(entity);
        assert!(!store.rename(entity, "ghost"));
    }

    #[test]
    fn test_iteration_follows_allocation_order_through_slot_reuse() {
        let mut store = EntityStore::new();
        let a = store.create(Some("a"));
        let b = store.create(Some("b"));
        let c = store.create(Some("c"));
        store.destroy(a);
        let d = store.create(Some("d"));

        let order: Vec<Entity> = store.iter().map(|(entity, _)| entity).collect();
        assert_eq!(order, vec![b, c, d]);
    }

    #[test]
    fn test_reserved_entity_joins_order_when_activated() {
        let mut store = EntityStore::new();
        let reserved = store.reserve(None);
        let live = store.create(None);
        store.activate(reserved);

        let order: Vec<Entity> = store.iter().map(|(entity, _)| entity).collect();
        assert_eq!(order, vec![live, reserved]);
    }
}
