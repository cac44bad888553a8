//! Component Storage
//!
//! One dense array per component type (a sparse set indexed by entity),
//! collected in a registry keyed by `TypeId`. Iteration follows insertion
//! order until a removal swaps the last element into the freed slot.
//!
//! Every write is stamped with a change tick so consumers such as the scene
//! graph can ask "which transforms changed since I last looked" without the
//! writer notifying them.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use slotmap::SecondaryMap;

use super::entity::EntityStore;
use super::{Component, EcsError, Entity};

/// Dense storage for a single component type
pub struct ComponentStorage<T: Component> {
    dense: Vec<T>,
    entities: Vec<Entity>,
    changed: Vec<u64>,
    index: SecondaryMap<Entity, usize>,
    last_removal: u64,
}

impl<T: Component> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self {
            dense: Vec::new(),
            entities: Vec::new(),
            changed: Vec::new(),
            index: SecondaryMap::new(),
            last_removal: 0,
        }
    }
}

impl<T: Component> ComponentStorage<T> {
    /// Number of stored components
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Whether the storage is empty
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Whether `entity` has a component in this storage
    pub fn contains(&self, entity: Entity) -> bool {
        self.index.contains_key(entity)
    }

    /// Shared access to an entity's component
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.index.get(entity).map(|&slot| &self.dense[slot])
    }

    /// Tick of the most recent removal from this storage (0 if none)
    pub fn last_removal_tick(&self) -> u64 {
        self.last_removal
    }

    /// Iterate `(entity, component)` in storage order
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.dense.iter())
    }

    /// Entities whose component was written after `tick`
    pub fn changed_since(&self, tick: u64) -> impl Iterator<Item = Entity> + '_ {
        self.entities
            .iter()
            .zip(self.changed.iter())
            .filter(move |(_, &changed)| changed > tick)
            .map(|(&entity, _)| entity)
    }

    fn insert(&mut self, entity: Entity, value: T, tick: u64) {
        self.index.insert(entity, self.dense.len());
        self.dense.push(value);
        self.entities.push(entity);
        self.changed.push(tick);
    }

    fn replace(&mut self, entity: Entity, value: T, tick: u64) -> Option<T> {
        if let Some(&slot) = self.index.get(entity) {
            self.changed[slot] = tick;
            Some(std::mem::replace(&mut self.dense[slot], value))
        } else {
            self.insert(entity, value, tick);
            None
        }
    }

    fn get_mut(&mut self, entity: Entity, tick: u64) -> Option<Mut<'_, T>> {
        let slot = *self.index.get(entity)?;
        Some(Mut {
            value: &mut self.dense[slot],
            changed: &mut self.changed[slot],
            tick,
        })
    }

    fn remove(&mut self, entity: Entity, tick: u64) -> Option<T> {
        let slot = self.index.remove(entity)?;
        let value = self.dense.swap_remove(slot);
        self.entities.swap_remove(slot);
        self.changed.swap_remove(slot);
        if let Some(&moved) = self.entities.get(slot) {
            self.index.insert(moved, slot);
        }
        self.last_removal = tick;
        Some(value)
    }
}

/// Mutable component access that records a change when written through
pub struct Mut<'a, T> {
    value: &'a mut T,
    changed: &'a mut u64,
    tick: u64,
}

impl<T> Deref for Mut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.value
    }
}

impl<T> DerefMut for Mut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        *self.changed = self.tick;
        &mut *self.value
    }
}

/// Type-erased view of a storage, used for whole-entity removal
trait ErasedStorage: Send + Sync {
    fn remove_entity(&mut self, entity: Entity, tick: u64) -> bool;
    fn contains_entity(&self, entity: Entity) -> bool;
    fn component_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStorage for ComponentStorage<T> {
    fn remove_entity(&mut self, entity: Entity, tick: u64) -> bool {
        self.remove(entity, tick).is_some()
    }

    fn contains_entity(&self, entity: Entity) -> bool {
        self.contains(entity)
    }

    fn component_name(&self) -> &'static str {
        T::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Registry of component storages, one per component type
#[derive(Default)]
pub struct ComponentStore {
    storages: HashMap<TypeId, Box<dyn ErasedStorage>>,
    // Registration order, so tooling lists component tags deterministically
    order: Vec<TypeId>,
    tick: u64,
}

impl ComponentStore {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Current change tick (the tick of the latest write)
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Attach a component. Rejects dead entities and duplicates; on rejection
    /// the store is unchanged.
    pub fn add<T: Component>(&mut self, entities: &EntityStore, entity: Entity, component: T) -> Result<(), EcsError> {
        if !entities.is_alive(entity) {
            return Err(EcsError::InvalidEntity(entity));
        }
        let tick = self.next_tick();
        let storage = self.storage_or_insert::<T>();
        if storage.contains(entity) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: T::NAME,
            });
        }
        storage.insert(entity, component, tick);
        Ok(())
    }

    /// Attach or overwrite a component, returning the previous value
    pub fn replace<T: Component>(&mut self, entities: &EntityStore, entity: Entity, component: T) -> Result<Option<T>, EcsError> {
        if !entities.is_alive(entity) {
            return Err(EcsError::InvalidEntity(entity));
        }
        let tick = self.next_tick();
        Ok(self.storage_or_insert::<T>().replace(entity, component, tick))
    }

    /// Shared access to an entity's component
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>()?.get(entity)
    }

    /// Mutable access to an entity's component; writes are change-tracked
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<Mut<'_, T>> {
        let tick = self.next_tick();
        self.storage_mut::<T>()?.get_mut(entity, tick)
    }

    /// Whether `entity` has a `T`
    pub fn contains<T: Component>(&self, entity: Entity) -> bool {
        self.storage::<T>().is_some_and(|storage| storage.contains(entity))
    }

    /// Detach a component; `None` if it was not attached
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let tick = self.next_tick();
        self.storage_mut::<T>()?.remove(entity, tick)
    }

    /// Detach every component of an entity, returning how many were removed
    pub fn remove_all(&mut self, entity: Entity) -> usize {
        let tick = self.next_tick();
        self.storages
            .values_mut()
            .map(|storage| storage.remove_entity(entity, tick))
            .filter(|&removed| removed)
            .count()
    }

    /// Iterate `(entity, component)` for one type in insertion order
    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.storage::<T>().into_iter().flat_map(ComponentStorage::iter)
    }

    /// Typed storage, if any component of this type was ever added
    pub fn storage<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .and_then(|storage| storage.as_any().downcast_ref::<ComponentStorage<T>>())
    }

    /// Component tags attached to an entity, in type registration order
    pub fn component_names(&self, entity: Entity) -> Vec<&'static str> {
        self.order
            .iter()
            .filter_map(|type_id| self.storages.get(type_id))
            .filter(|storage| storage.contains_entity(entity))
            .map(|storage| storage.component_name())
            .collect()
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn storage_mut<T: Component>(&mut self) -> Option<&mut ComponentStorage<T>> {
        self.storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|storage| storage.as_any_mut().downcast_mut::<ComponentStorage<T>>())
    }

    fn storage_or_insert<T: Component>(&mut self) -> &mut ComponentStorage<T> {
        let type_id = TypeId::of::<T>();
        if !self.storages.contains_key(&type_id) {
            self.order.push(type_id);
        }
        self.storages
            .entry(type_id)
            .or_insert_with(|| Box::new(ComponentStorage::<T>::default()))
            .as_any_mut()
            .downcast_mut::<ComponentStorage<T>>()
            .unwrap_or_else(|| unreachable!("storage registered under a foreign TypeId"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Health(i32);

    impl Component for Health {
        const NAME: &'static str = "Health";
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Tag;

    impl Component for Tag {
        const NAME: &'static str = "Tag";
    }

    fn setup(count: usize) -> (EntityStore, ComponentStore, Vec<Entity>) {
        let mut entities = EntityStore::new();
        let ids = (0..count).map(|_| entities.create(None)).collect();
        (entities, ComponentStore::new(), ids)
    }

    #[test]
    fn test_add_get_remove() {
        let (entities, mut store, ids) = setup(1);
        store.add(&entities, ids[0], Health(10)).unwrap();

        assert_eq!(store.get::<Health>(ids[0]), Some(&Health(10)));
        assert!(store.contains::<Health>(ids[0]));
        assert_eq!(store.remove::<Health>(ids[0]), Some(Health(10)));
        assert_eq!(store.get::<Health>(ids[0]), None);
        assert_eq!(store.remove::<Health>(ids[0]), None);
    }

    #[test]
    fn test_duplicate_component_is_rejected_without_change() {
        let (entities, mut store, ids) = setup(1);
        store.add(&entities, ids[0], Health(10)).unwrap();

        let result = store.add(&entities, ids[0], Health(99));
        assert!(matches!(
            result,
            Err(EcsError::DuplicateComponent { component: "Health", .. })
        ));
        assert_eq!(store.get::<Health>(ids[0]), Some(&Health(10)));
    }

    #[test]
    fn test_add_to_destroyed_entity_is_invalid() {
        let (mut entities, mut store, ids) = setup(1);
        entities.destroy(ids[0]);
        assert_eq!(store.add(&entities, ids[0], Health(1)), Err(EcsError::InvalidEntity(ids[0])));
        assert!(store.storage::<Health>().map_or(true, ComponentStorage::is_empty));
    }

    #[test]
    fn test_replace_overwrites() {
        let (entities, mut store, ids) = setup(1);
        assert_eq!(store.replace(&entities, ids[0], Health(1)).unwrap(), None);
        assert_eq!(store.replace(&entities, ids[0], Health(2)).unwrap(), Some(Health(1)));
        assert_eq!(store.get::<Health>(ids[0]), Some(&Health(2)));
    }

    #[test]
    fn test_iteration_follows_insertion_order_and_survives_removal() {
        let (entities, mut store, ids) = setup(4);
        for (i, &entity) in ids.iter().enumerate() {
            store.add(&entities, entity, Health(i32::try_from(i).unwrap())).unwrap();
        }

        let order: Vec<Entity> = store.iter::<Health>().map(|(e, _)| e).collect();
        assert_eq!(order, ids);

        store.remove::<Health>(ids[1]);
        let remaining: Vec<i32> = store.iter::<Health>().map(|(_, h)| h.0).collect();
        assert_eq!(remaining.len(), 3);
        assert!(!remaining.contains(&1));
        // Lookups stay correct after the swap-remove
        assert_eq!(store.get::<Health>(ids[3]), Some(&Health(3)));
    }

    #[test]
    fn test_remove_all_clears_every_type() {
        let (entities, mut store, ids) = setup(2);
        store.add(&entities, ids[0], Health(5)).unwrap();
        store.add(&entities, ids[0], Tag).unwrap();
        store.add(&entities, ids[1], Tag).unwrap();

        assert_eq!(store.component_names(ids[0]), vec!["Health", "Tag"]);
        assert_eq!(store.remove_all(ids[0]), 2);
        assert!(store.component_names(ids[0]).is_empty());
        assert!(store.contains::<Tag>(ids[1]));
    }

    #[test]
    fn test_change_ticks_track_writes_not_reads() {
        let (entities, mut store, ids) = setup(2);
        store.add(&entities, ids[0], Health(1)).unwrap();
        store.add(&entities, ids[1], Health(2)).unwrap();
        let checkpoint = store.tick();

        // Reading through `Mut` does not count as a change
        let value = store.get_mut::<Health>(ids[0]).map(|h| h.0);
        assert_eq!(value, Some(1));
        let storage = store.storage::<Health>().unwrap();
        assert_eq!(storage.changed_since(checkpoint).count(), 0);

        if let Some(mut health) = store.get_mut::<Health>(ids[1]) {
            health.0 += 1;
        }
        let changed: Vec<Entity> = store.storage::<Health>().unwrap().changed_since(checkpoint).collect();
        assert_eq!(changed, vec![ids[1]]);
    }
}
