//! Scene graph
//!
//! Parent/child hierarchy over ECS entities. Local transforms live in the
//! world as [`TransformComponent`]s; the graph caches each node's world
//! transform and recomputes it when the node or one of its ancestors changed.
//!
//! Dirty flags follow one rule: a dirty node implies all of its descendants
//! are dirty. Changes are discovered through component change ticks during
//! [`SceneGraph::sync`], so code that edits a transform never has to notify
//! the graph.

use log::{debug, trace, warn};
use slotmap::SecondaryMap;

use super::node::SceneNode;
use super::SceneError;
use crate::ecs::components::TransformComponent;
use crate::ecs::{Entity, World};
use crate::foundation::math::Transform;

/// Hierarchy of entities with cached world transforms
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SecondaryMap<Entity, SceneNode>,
    roots: Vec<Entity>,
    last_sync: u64,
}

impl SceneGraph {
    /// Create an empty scene graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes, floating ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the entity has a node
    pub fn contains(&self, entity: Entity) -> bool {
        self.nodes.contains_key(entity)
    }

    /// Node of an entity
    pub fn node(&self, entity: Entity) -> Option<&SceneNode> {
        self.nodes.get(entity)
    }

    /// Root entities in insertion order
    pub fn roots(&self) -> &[Entity] {
        &self.roots
    }

    /// Parent of an entity
    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.nodes.get(entity).and_then(|node| node.parent)
    }

    /// Children of an entity in insertion order (empty if it has no node)
    pub fn children(&self, entity: Entity) -> &[Entity] {
        self.nodes.get(entity).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    /// Add a live entity as a root. Entities already in the graph are left
    /// where they are.
    pub fn insert(&mut self, world: &World, entity: Entity) -> Result<(), SceneError> {
        if !world.is_alive(entity) {
            return Err(SceneError::InvalidEntity(entity));
        }
        self.insert_root(entity);
        Ok(())
    }

    /// Attach `child` under `parent`, or to the root list when `parent` is
    /// `None`. The child keeps its sub-tree and moves out of its old position.
    ///
    /// Fails with [`SceneError::CycleDetected`] if `parent` is `child` or one
    /// of its descendants; the graph is unchanged on failure.
    pub fn attach(&mut self, world: &World, child: Entity, parent: Option<Entity>) -> Result<(), SceneError> {
        if !world.is_alive(child) {
            return Err(SceneError::InvalidEntity(child));
        }
        if let Some(parent) = parent {
            if !world.is_alive(parent) {
                return Err(SceneError::InvalidEntity(parent));
            }
            if self.is_self_or_ancestor(child, parent) {
                warn!("Refusing to attach {:?} under its own descendant {:?}", child, parent);
                return Err(SceneError::CycleDetected { child, parent });
            }
            self.insert_root(parent);
        }

        if let Some(node) = self.nodes.get(child) {
            let unchanged = match parent {
                Some(_) => node.parent == parent,
                None => node.is_root,
            };
            if unchanged {
                return Ok(());
            }
        } else {
            let mut node = SceneNode::root();
            node.is_root = false;
            self.nodes.insert(child, node);
        }

        self.unlink(child);
        self.link(child, parent);
        self.mark_subtree_dirty(child);
        trace!("Attached {:?} to {:?}", child, parent);
        Ok(())
    }

    /// Take an entity out of its parent's child list (or the root list).
    ///
    /// The entity keeps its own sub-tree but floats: it is neither traversed
    /// nor rendered until attached again. Its world transform becomes its
    /// local transform.
    pub fn detach(&mut self, entity: Entity) -> Result<(), SceneError> {
        if !self.nodes.contains_key(entity) {
            return Err(SceneError::InvalidEntity(entity));
        }
        self.unlink(entity);
        self.mark_subtree_dirty(entity);
        Ok(())
    }

    /// Drop an entity's node. Its children become roots and keep their
    /// local transforms. The entity itself is untouched.
    pub fn remove(&mut self, entity: Entity) -> bool {
        if !self.nodes.contains_key(entity) {
            return false;
        }
        self.unlink(entity);
        let Some(node) = self.nodes.remove(entity) else {
            return false;
        };
        for child in node.children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = None;
                child_node.is_root = true;
                self.roots.push(child);
                self.mark_subtree_dirty(child);
            }
        }
        true
    }

    /// Destroy an entity together with its whole sub-tree, returning how
    /// many entities were destroyed.
    pub fn despawn_recursive(&mut self, world: &mut World, entity: Entity) -> Result<usize, SceneError> {
        if !self.nodes.contains_key(entity) {
            return if world.destroy_entity(entity) {
                Ok(1)
            } else {
                Err(SceneError::InvalidEntity(entity))
            };
        }
        let subtree = self.subtree(entity);
        self.unlink(entity);
        for &doomed in &subtree {
            self.nodes.remove(doomed);
            world.destroy_entity(doomed);
        }
        debug!("Despawned {:?} with {} descendants", entity, subtree.len() - 1);
        Ok(subtree.len())
    }

    /// Local transform of an entity (identity when it has no transform)
    pub fn local_transform(&self, world: &World, entity: Entity) -> Option<Transform> {
        if !world.is_alive(entity) {
            return None;
        }
        Some(local_of(world, entity))
    }

    /// Overwrite an entity's local transform and dirty its sub-tree.
    /// Entities not yet in the graph are added as roots.
    pub fn set_local_transform(&mut self, world: &mut World, entity: Entity, transform: Transform) -> Result<(), SceneError> {
        world
            .replace_component(entity, TransformComponent::from_math_transform(&transform))
            .map_err(|_| SceneError::InvalidEntity(entity))?;
        if self.nodes.contains_key(entity) {
            self.mark_subtree_dirty(entity);
        } else {
            self.insert_root(entity);
        }
        Ok(())
    }

    /// Cached world transform, if it is up to date
    pub fn world_transform(&self, entity: Entity) -> Option<Transform> {
        self.nodes.get(entity).filter(|node| !node.dirty).map(|node| node.world)
    }

    /// World transform of an entity: parent world composed with local.
    ///
    /// Returns the cached value when nothing on the ancestor chain changed;
    /// otherwise recomputes the dirty part of the chain and caches it.
    pub fn compute_world_transform(&mut self, world: &World, entity: Entity) -> Option<Transform> {
        self.sync(world);
        let node = self.nodes.get(entity)?;
        if !node.dirty {
            return Some(node.world);
        }

        let mut chain = vec![entity];
        let mut base = Transform::identity();
        let mut cursor = node.parent;
        while let Some(ancestor) = cursor {
            let Some(ancestor_node) = self.nodes.get(ancestor) else {
                break;
            };
            if !ancestor_node.dirty {
                base = ancestor_node.world;
                break;
            }
            chain.push(ancestor);
            cursor = ancestor_node.parent;
        }

        for link in chain.into_iter().rev() {
            base = base.combine(&local_of(world, link));
            if let Some(node) = self.nodes.get_mut(link) {
                node.world = base;
                node.dirty = false;
            }
        }
        Some(base)
    }

    /// Recompute every dirty node reachable from the roots, parents before
    /// children. Returns the number of nodes recomputed.
    pub fn update_transforms(&mut self, world: &World) -> usize {
        self.sync(world);

        let mut stack: Vec<(Entity, Transform)> =
            self.roots.iter().rev().map(|&root| (root, Transform::identity())).collect();
        let mut updated = 0;
        while let Some((entity, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(entity) else {
                continue;
            };
            if node.dirty {
                node.world = parent_world.combine(&local_of(world, entity));
                node.dirty = false;
                updated += 1;
            }
            let node_world = node.world;
            stack.extend(node.children.iter().rev().map(|&child| (child, node_world)));
        }
        if updated > 0 {
            trace!("Recomputed {} world transforms", updated);
        }
        updated
    }

    /// Bring the graph up to date with the world.
    ///
    /// Entities that gained a transform become roots, nodes of destroyed
    /// entities are dropped (their children become roots), and nodes whose
    /// transform changed since the previous sync are marked dirty.
    pub fn sync(&mut self, world: &World) {
        if world.despawn_tick() > self.last_sync {
            let dead: Vec<Entity> = self.nodes.keys().filter(|&entity| !world.is_alive(entity)).collect();
            for entity in dead {
                self.remove(entity);
                trace!("Pruned node of destroyed entity {:?}", entity);
            }
        }

        for entity in world.changed_since::<TransformComponent>(self.last_sync) {
            if self.nodes.contains_key(entity) {
                self.mark_subtree_dirty(entity);
            } else {
                self.insert_root(entity);
            }
        }

        // A removed transform reverts the node to identity
        let removed_transform = world
            .storage::<TransformComponent>()
            .is_some_and(|storage| storage.last_removal_tick() > self.last_sync);
        if removed_transform {
            for node in self.nodes.values_mut() {
                node.dirty = true;
            }
        }

        self.last_sync = world.change_tick();
    }

    /// Visit nodes depth-first from the roots, parents before children and
    /// siblings in insertion order. Returning `false` from `visit` skips the
    /// node's descendants.
    pub fn traverse(&self, mut visit: impl FnMut(Entity, &SceneNode) -> bool) {
        let mut stack: Vec<Entity> = self.roots.iter().rev().copied().collect();
        while let Some(entity) = stack.pop() {
            let Some(node) = self.nodes.get(entity) else {
                continue;
            };
            if visit(entity, node) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    /// All reachable entities in depth-first order
    pub fn depth_first(&self) -> Vec<Entity> {
        let mut order = Vec::with_capacity(self.nodes.len());
        self.traverse(|entity, _| {
            order.push(entity);
            true
        });
        order
    }

    /// An entity followed by all of its descendants, depth-first
    pub fn subtree(&self, entity: Entity) -> Vec<Entity> {
        let mut order = Vec::new();
        let mut stack = vec![entity];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            order.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }

    fn insert_root(&mut self, entity: Entity) {
        if !self.nodes.contains_key(entity) {
            self.nodes.insert(entity, SceneNode::root());
            self.roots.push(entity);
        }
    }

    fn is_self_or_ancestor(&self, candidate: Entity, of: Entity) -> bool {
        let mut cursor = Some(of);
        while let Some(current) = cursor {
            if current == candidate {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|node| node.parent);
        }
        false
    }

    fn unlink(&mut self, entity: Entity) {
        let Some(node) = self.nodes.get_mut(entity) else {
            return;
        };
        let parent = node.parent.take();
        let was_root = std::mem::replace(&mut node.is_root, false);

        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|&child| child != entity);
            }
        } else if was_root {
            self.roots.retain(|&root| root != entity);
        }
    }

    fn link(&mut self, entity: Entity, parent: Option<Entity>) {
        match parent {
            Some(parent) => {
                if let Some(parent_node) = self.nodes.get_mut(parent) {
                    parent_node.children.push(entity);
                }
                if let Some(node) = self.nodes.get_mut(entity) {
                    node.parent = Some(parent);
                }
            }
            None => {
                if let Some(node) = self.nodes.get_mut(entity) {
                    node.is_root = true;
                }
                self.roots.push(entity);
            }
        }
    }

    fn mark_subtree_dirty(&mut self, entity: Entity) {
        let mut stack = vec![entity];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current) else {
                continue;
            };
            // Descendants of a dirty node are already dirty, except the
            // starting node whose links may just have changed
            if node.dirty && current != entity {
                continue;
            }
            node.dirty = true;
            stack.extend(node.children.iter().copied());
        }
    }
}

fn local_of(world: &World, entity: Entity) -> Transform {
    world
        .get_component::<TransformComponent>(entity)
        .map(TransformComponent::to_math_transform)
        .unwrap_or_else(Transform::identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Quat, Vec3};
    use approx::assert_relative_eq;

    fn spawn(world: &mut World, name: &str, position: Vec3) -> Entity {
        let entity = world.create_entity(Some(name));
        world.add_component(entity, TransformComponent::from_position(position)).unwrap();
        entity
    }

    #[test]
    fn test_moving_parent_moves_child() {
        let mut world = World::new();
        let e1 = spawn(&mut world, "E1", Vec3::zeros());
        let e2 = spawn(&mut world, "E2", Vec3::new(1.0, 0.0, 0.0));

        let mut scene = SceneGraph::new();
        scene.sync(&world);
        scene.attach(&world, e2, Some(e1)).unwrap();
        scene.update_transforms(&world);
        assert_relative_eq!(scene.world_transform(e2).unwrap().position, Vec3::new(1.0, 0.0, 0.0));

        world.get_component_mut::<TransformComponent>(e1).unwrap().position = Vec3::new(5.0, 0.0, 0.0);
        scene.update_transforms(&world);

        assert_relative_eq!(scene.world_transform(e2).unwrap().position, Vec3::new(6.0, 0.0, 0.0));
    }

    #[test]
    fn test_world_transform_composes_parent_and_local() {
        let mut world = World::new();
        let parent = world.create_entity(Some("parent"));
        let mut parent_local = TransformComponent::from_position(Vec3::new(0.0, 2.0, 0.0)).with_uniform_scale(2.0);
        parent_local.rotation = Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_2);
        world.add_component(parent, parent_local).unwrap();
        let child = spawn(&mut world, "child", Vec3::new(1.0, 0.0, 0.0));

        let mut scene = SceneGraph::new();
        scene.attach(&world, child, Some(parent)).unwrap();
        let computed = scene.compute_world_transform(&world, child).unwrap();

        let expected = parent_local.to_math_transform().combine(&Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        assert_relative_eq!(computed.position, expected.position, epsilon = 1e-5);
        // Scale 2, rotate 90 degrees about Z, then translate
        assert_relative_eq!(computed.position, Vec3::new(0.0, 4.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(
            computed.to_matrix(),
            parent_local.to_matrix() * TransformComponent::from_position(Vec3::new(1.0, 0.0, 0.0)).to_matrix(),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_cached_value_is_returned_until_something_changes() {
        let mut world = World::new();
        let root = spawn(&mut world, "root", Vec3::new(1.0, 0.0, 0.0));
        let mut scene = SceneGraph::new();

        let first = scene.compute_world_transform(&world, root).unwrap();
        assert!(!scene.node(root).unwrap().is_dirty());
        assert_eq!(scene.update_transforms(&world), 0);
        assert_eq!(scene.compute_world_transform(&world, root), Some(first));
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut world = World::new();
        let a = spawn(&mut world, "a", Vec3::zeros());
        let b = spawn(&mut world, "b", Vec3::zeros());
        let c = spawn(&mut world, "c", Vec3::zeros());

        let mut scene = SceneGraph::new();
        scene.attach(&world, b, Some(a)).unwrap();
        scene.attach(&world, c, Some(b)).unwrap();

        assert_eq!(scene.attach(&world, a, Some(a)), Err(SceneError::CycleDetected { child: a, parent: a }));
        assert_eq!(scene.attach(&world, a, Some(c)), Err(SceneError::CycleDetected { child: a, parent: c }));
        assert_eq!(scene.attach(&world, b, Some(c)), Err(SceneError::CycleDetected { child: b, parent: c }));

        // Unchanged after the failed attempts
        assert_eq!(scene.roots(), &[a]);
        assert_eq!(scene.children(a), &[b]);
        assert_eq!(scene.children(b), &[c]);

        // Moving a node to a non-descendant is fine
        scene.attach(&world, c, Some(a)).unwrap();
        assert_eq!(scene.children(a), &[b, c]);
        assert!(scene.children(b).is_empty());
    }

    #[test]
    fn test_detach_floats_subtree_and_reattach_restores_local() {
        let mut world = World::new();
        let parent = spawn(&mut world, "parent", Vec3::new(10.0, 0.0, 0.0));
        let child = spawn(&mut world, "child", Vec3::new(1.0, 2.0, 3.0));
        let grandchild = spawn(&mut world, "grandchild", Vec3::new(0.0, 1.0, 0.0));

        let mut scene = SceneGraph::new();
        scene.sync(&world);
        scene.attach(&world, child, Some(parent)).unwrap();
        scene.attach(&world, grandchild, Some(child)).unwrap();
        scene.update_transforms(&world);

        scene.detach(child).unwrap();
        assert!(scene.node(child).unwrap().is_floating());
        assert_eq!(scene.depth_first(), vec![parent]);
        // The sub-tree moved with it
        assert_eq!(scene.children(child), &[grandchild]);

        scene.attach(&world, child, None).unwrap();
        scene.update_transforms(&world);
        assert_relative_eq!(scene.world_transform(child).unwrap().position, Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(scene.world_transform(grandchild).unwrap().position, Vec3::new(1.0, 3.0, 3.0));
    }

    #[test]
    fn test_depth_first_order() {
        let mut world = World::new();
        let a = spawn(&mut world, "a", Vec3::zeros());
        let b = spawn(&mut world, "b", Vec3::zeros());
        let a1 = spawn(&mut world, "a1", Vec3::zeros());
        let a2 = spawn(&mut world, "a2", Vec3::zeros());
        let a1x = spawn(&mut world, "a1x", Vec3::zeros());

        let mut scene = SceneGraph::new();
        scene.insert(&world, a).unwrap();
        scene.insert(&world, b).unwrap();
        scene.attach(&world, a1, Some(a)).unwrap();
        scene.attach(&world, a2, Some(a)).unwrap();
        scene.attach(&world, a1x, Some(a1)).unwrap();

        assert_eq!(scene.depth_first(), vec![a, a1, a1x, a2, b]);
    }

    #[test]
    fn test_dirty_flag_propagates_down_not_up() {
        let mut world = World::new();
        let parent = spawn(&mut world, "parent", Vec3::zeros());
        let child = spawn(&mut world, "child", Vec3::zeros());
        let mut scene = SceneGraph::new();
        scene.attach(&world, child, Some(parent)).unwrap();
        scene.update_transforms(&world);

        world.get_component_mut::<TransformComponent>(child).unwrap().position.x = 1.0;
        scene.sync(&world);
        assert!(!scene.node(parent).unwrap().is_dirty());
        assert!(scene.node(child).unwrap().is_dirty());

        world.get_component_mut::<TransformComponent>(parent).unwrap().rotation =
            Quat::from_axis_angle(&Vec3::y_axis(), 1.0);
        scene.sync(&world);
        assert!(scene.node(parent).unwrap().is_dirty());
        assert!(scene.node(child).unwrap().is_dirty());
        assert_eq!(scene.update_transforms(&world), 2);
    }

    #[test]
    fn test_destroyed_parent_reroots_children() {
        let mut world = World::new();
        let parent = spawn(&mut world, "parent", Vec3::new(4.0, 0.0, 0.0));
        let child = spawn(&mut world, "child", Vec3::new(1.0, 0.0, 0.0));
        let mut scene = SceneGraph::new();
        scene.sync(&world);
        scene.attach(&world, child, Some(parent)).unwrap();
        scene.update_transforms(&world);

        world.destroy_entity(parent);
        scene.update_transforms(&world);

        assert!(!scene.contains(parent));
        assert_eq!(scene.roots(), &[child]);
        assert_relative_eq!(scene.world_transform(child).unwrap().position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_despawn_recursive_destroys_subtree() {
        let mut world = World::new();
        let root = spawn(&mut world, "root", Vec3::zeros());
        let child = spawn(&mut world, "child", Vec3::zeros());
        let leaf = spawn(&mut world, "leaf", Vec3::zeros());
        let other = spawn(&mut world, "other", Vec3::zeros());
        let mut scene = SceneGraph::new();
        scene.sync(&world);
        scene.attach(&world, child, Some(root)).unwrap();
        scene.attach(&world, leaf, Some(child)).unwrap();

        assert_eq!(scene.despawn_recursive(&mut world, child), Ok(2));
        assert!(!world.is_alive(child));
        assert!(!world.is_alive(leaf));
        assert!(scene.children(root).is_empty());
        assert_eq!(scene.depth_first(), vec![root, other]);
    }

    #[test]
    fn test_dead_entities_are_rejected() {
        let mut world = World::new();
        let alive = spawn(&mut world, "alive", Vec3::zeros());
        let dead = spawn(&mut world, "dead", Vec3::zeros());
        world.destroy_entity(dead);

        let mut scene = SceneGraph::new();
        assert_eq!(scene.attach(&world, dead, None), Err(SceneError::InvalidEntity(dead)));
        assert_eq!(scene.attach(&world, alive, Some(dead)), Err(SceneError::InvalidEntity(dead)));
        assert_eq!(scene.detach(dead), Err(SceneError::InvalidEntity(dead)));
    }

    #[test]
    fn test_set_local_transform_marks_subtree() {
        let mut world = World::new();
        let parent = spawn(&mut world, "parent", Vec3::zeros());
        let child = spawn(&mut world, "child", Vec3::new(0.0, 0.0, 1.0));
        let mut scene = SceneGraph::new();
        scene.attach(&world, child, Some(parent)).unwrap();
        scene.update_transforms(&world);

        scene
            .set_local_transform(&mut world, parent, Transform::from_position(Vec3::new(0.0, 3.0, 0.0)))
            .unwrap();
        assert!(scene.node(child).unwrap().is_dirty());
        let child_world = scene.compute_world_transform(&world, child).unwrap();
        assert_relative_eq!(child_world.position, Vec3::new(0.0, 3.0, 1.0));
        assert_eq!(
            scene.local_transform(&world, parent).map(|t| t.position),
            Some(Vec3::new(0.0, 3.0, 0.0))
        );
    }
}
