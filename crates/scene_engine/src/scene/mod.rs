//! Scene management system
//!
//! Gives ECS entities a parent/child structure and derives world transforms
//! from the local [`TransformComponent`](crate::ecs::components::TransformComponent)s
//! stored in the world.
//!
//! ```text
//! ECS World (local transforms)
//!      ↓  sync: change ticks, despawns
//! Scene Graph (hierarchy, cached world transforms)
//!      ↓  depth-first traversal
//! Render Pipeline
//! ```

mod node;
mod scene_graph;

pub use node::SceneNode;
pub use scene_graph::SceneGraph;

use crate::ecs::Entity;

/// Scene graph errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The entity is not alive or has no node
    #[error("Entity {0:?} is not in the scene")]
    InvalidEntity(Entity),

    /// Attaching would make a node its own ancestor
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    CycleDetected {
        /// Entity being attached
        child: Entity,
        /// Requested parent
        parent: Entity,
    },
}
