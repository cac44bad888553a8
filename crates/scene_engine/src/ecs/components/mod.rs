//! ECS Components module
//!
//! Built-in components understood by the scene graph and the renderer

pub mod renderable;
pub mod transform;

pub use renderable::RenderableComponent;
pub use transform::TransformComponent;
