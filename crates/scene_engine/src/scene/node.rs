//! Scene node

use crate::ecs::Entity;
use crate::foundation::math::Transform;

/// Hierarchy entry for one entity, with its cached world transform
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub(crate) parent: Option<Entity>,
    pub(crate) children: Vec<Entity>,
    pub(crate) world: Transform,
    pub(crate) dirty: bool,
    pub(crate) is_root: bool,
}

impl SceneNode {
    pub(crate) fn root() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            world: Transform::identity(),
            dirty: true,
            is_root: true,
        }
    }

    /// Parent entity (None for roots and floating nodes)
    pub fn parent(&self) -> Option<Entity> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    /// Whether this node is in the root list
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Detached from both a parent and the root list
    pub fn is_floating(&self) -> bool {
        self.parent.is_none() && !self.is_root
    }

    /// Whether the cached world transform is stale
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Cached world transform, valid when the node is not dirty
    pub fn cached_world_transform(&self) -> &Transform {
        &self.world
    }
}
