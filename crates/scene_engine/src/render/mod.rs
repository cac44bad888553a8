//! # Rendering System
//!
//! Backend-agnostic render pipeline over the scene graph.
//!
//! ## Architecture
//!
//! - **Renderer**: frame coordinator; walks the scene, builds the render
//!   queue, uploads meshes lazily and submits frames
//! - **RenderBackend**: contract a graphics API implements
//! - **HeadlessBackend**: in-memory backend for tests and tools
//! - **Camera**: perspective camera producing view and projection matrices
//! - **RenderState**: fixed-function state (depth test, culling, viewport)
//!
//! Each frame, renderables are visited in scene graph depth-first order,
//! stably sorted by layer, and submitted with their cached world matrices.

pub mod backend;
pub mod backends;
pub mod camera;
pub mod mesh;
pub mod pipeline;
pub mod queue;
pub mod state;

pub use backend::{ContextInfo, FrameSubmission, GpuDraw, MeshHandle, RenderBackend};
pub use backends::{HeadlessBackend, MeshRecord, RecordedFrame};
pub use camera::Camera;
pub use mesh::{Mesh, Vertex};
pub use pipeline::{RenderStats, Renderer};
pub use queue::{DrawCommand, ObjectUniforms, RenderQueue};
pub use state::{CullFace, DepthFunc, FrontFace, RenderFlags, RenderState, Viewport};

use thiserror::Error;

/// Errors that can occur during rendering operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    ///
    /// Occurs when the backend cannot create its context, or when a context
    /// already exists.
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// Resource creation or management failed
    ///
    /// Covers surfaces, buffers and mesh uploads with invalid data.
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// The renderer was used before `initialize` succeeded
    #[error("Renderer not initialized")]
    NotInitialized,
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
