//! # Render Queue
//!
//! Draw commands collected for one frame, in scene traversal order.
//!
//! - **DrawCommand**: one entity's mesh, model matrix and color
//! - **ObjectUniforms**: per-object data as laid out for the GPU
//! - **RenderQueue**: the frame's commands plus counts of placeholder and
//!   skipped draws

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use super::mesh::Mesh;
use crate::ecs::Entity;
use crate::foundation::math::Mat4;

/// Per-object uniform block
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    /// Object-to-world matrix (column major)
    pub model: [[f32; 4]; 4],
    /// Object-to-clip matrix (column major)
    pub mvp: [[f32; 4]; 4],
    /// Base color
    pub color: [f32; 4],
}

impl ObjectUniforms {
    /// Pack matrices and color
    pub fn new(model: &Mat4, view_projection: &Mat4, color: [f32; 4]) -> Self {
        Self {
            model: (*model).into(),
            mvp: (view_projection * model).into(),
            color,
        }
    }
}

/// One draw for one entity
#[derive(Debug, Clone)]
pub struct DrawCommand {
    /// Entity being drawn
    pub entity: Entity,
    /// Asset key of the requested mesh
    pub mesh_key: String,
    /// Loaded mesh; `None` draws the placeholder
    pub mesh: Option<Arc<Mesh>>,
    /// World matrix from the scene graph
    pub model: Mat4,
    /// Base color
    pub color: [f32; 4],
    /// Sort layer (higher draws later)
    pub layer: u8,
}

/// Draw commands for a frame
#[derive(Debug, Clone, Default)]
pub struct RenderQueue {
    commands: Vec<DrawCommand>,
    skipped: usize,
}

impl RenderQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command
    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    /// Count a renderable left out of the frame
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Order by layer; traversal order is kept within a layer
    pub fn sort_by_layer(&mut self) {
        self.commands.sort_by_key(|command| command.layer);
    }

    /// Commands in submission order
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the queue has no commands
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Renderables left out because their mesh was missing
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn command(layer: u8, id: u64) -> DrawCommand {
        DrawCommand {
            entity: Entity::from(KeyData::from_ffi(id)),
            mesh_key: "cube".to_string(),
            mesh: None,
            model: Mat4::identity(),
            color: [1.0; 4],
            layer,
        }
    }

    #[test]
    fn test_layer_sort_is_stable() {
        let mut queue = RenderQueue::new();
        queue.push(command(1, 1));
        queue.push(command(0, 2));
        queue.push(command(1, 3));
        queue.push(command(0, 4));
        queue.sort_by_layer();

        let order: Vec<Entity> = queue.commands().iter().map(|c| c.entity).collect();
        let expected: Vec<Entity> = [2, 4, 1, 3].iter().map(|&id| Entity::from(KeyData::from_ffi(id))).collect();
        assert_eq!(order, expected);
        assert!(queue.commands().iter().all(|command| command.mesh.is_none()));
    }

    #[test]
    fn test_uniforms_pack_model_and_mvp() {
        let model = Mat4::new_translation(&crate::foundation::math::Vec3::new(1.0, 2.0, 3.0));
        let view_projection = Mat4::new_scaling(2.0);
        let uniforms = ObjectUniforms::new(&model, &view_projection, [0.5; 4]);

        assert_eq!(uniforms.model[3][..3], [1.0, 2.0, 3.0]);
        assert_eq!(uniforms.mvp[3][..3], [2.0, 4.0, 6.0]);
        assert_eq!(bytemuck::bytes_of(&uniforms).len(), 36 * 4);
    }
}
