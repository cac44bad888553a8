//! Entity-Component-System implementation
//!
//! Entities are generational ids, components live in one dense array per
//! type, and systems run in registration order once per world update.

pub mod commands;
pub mod component;
pub mod components;
pub mod entity;
pub mod storage;
pub mod system;
pub mod world;

pub use commands::{CommandQueue, Commands};
pub use component::Component;
pub use entity::{Entity, EntityRecord, EntityStore};
pub use storage::{ComponentStorage, ComponentStore, Mut};
pub use system::{NamedSystem, System};
pub use world::World;

/// ECS errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The entity is not alive
    #[error("Entity {0:?} does not exist")]
    InvalidEntity(Entity),

    /// The entity already carries a component of this type
    #[error("Entity {entity:?} already has a {component} component")]
    DuplicateComponent {
        /// Target entity
        entity: Entity,
        /// Component tag
        component: &'static str,
    },
}
