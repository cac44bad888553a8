//! Renderable component for entities that can be rendered
//!
//! Marks an entity as drawable and names the mesh asset to draw with. The mesh
//! is looked up in the asset cache at render time, so a renderable can exist
//! before its mesh has finished loading.

use crate::ecs::Component;

/// Component for entities that can be rendered
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableComponent {
    /// Asset cache key of the mesh
    pub mesh: String,

    /// Base color (RGBA)
    pub color: [f32; 4],

    /// Whether this object is visible
    pub visible: bool,

    /// Rendering layer for sorting (higher values render later)
    pub render_layer: u8,
}

impl Component for RenderableComponent {
    const NAME: &'static str = "Renderable";
}

impl RenderableComponent {
    /// Create a visible, white renderable for the given mesh key
    pub fn new(mesh: impl Into<String>) -> Self {
        Self {
            mesh: mesh.into(),
            color: [1.0, 1.0, 1.0, 1.0],
            visible: true,
            render_layer: 0,
        }
    }

    /// Builder pattern: Set base color
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    /// Check if this component should be rendered
    pub fn should_render(&self) -> bool {
        self.visible && self.color[3] > 0.0
    }
}
