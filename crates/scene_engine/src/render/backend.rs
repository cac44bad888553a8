//! Backend abstraction traits for the rendering system
//!
//! This module defines the contract a graphics backend implements for the
//! render pipeline: context creation, GPU mesh lifetime and frame submission.

use std::any::Any;

use super::mesh::Mesh;
use super::queue::ObjectUniforms;
use super::state::RenderState;
use super::RenderResult;
use crate::ecs::Entity;
use crate::foundation::math::Mat4;

/// Handle to a mesh resource stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Description of a created rendering context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    /// Backend name
    pub backend: String,
    /// Device vendor
    pub vendor: String,
    /// API or driver version
    pub version: String,
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
}

/// A single draw as submitted to the backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuDraw {
    /// Entity the draw belongs to
    pub entity: Entity,
    /// Uploaded mesh
    pub mesh: MeshHandle,
    /// Per-object uniforms
    pub uniforms: ObjectUniforms,
    /// Whether the mesh is the placeholder
    pub placeholder: bool,
}

/// Everything a backend needs to draw one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameSubmission<'a> {
    /// Monotonic frame number
    pub frame_index: u64,
    /// Fixed-function state
    pub state: &'a RenderState,
    /// Camera view matrix
    pub view: Mat4,
    /// Camera projection matrix
    pub projection: Mat4,
    /// Draws in submission order
    pub draws: &'a [GpuDraw],
}

/// Main rendering backend trait
///
/// Backends are driven from the frame loop's thread only. Calls other than
/// `initialize` fail with [`RenderError::NotInitialized`](super::RenderError)
/// until a context exists.
pub trait RenderBackend {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Create the rendering context for a surface and apply `state`
    fn initialize(&mut self, width: u32, height: u32, state: &RenderState) -> RenderResult<ContextInfo>;

    /// Upload mesh data and return an opaque handle
    fn upload_mesh(&mut self, mesh: &Mesh) -> RenderResult<MeshHandle>;

    /// Free an uploaded mesh. Returns `false` for unknown handles.
    fn release_mesh(&mut self, handle: MeshHandle) -> bool;

    /// Draw one frame
    fn render(&mut self, frame: &FrameSubmission<'_>) -> RenderResult<()>;

    /// Resize the drawing surface
    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()>;

    /// Release every resource and the context. Idempotent.
    fn destroy(&mut self);

    /// Current context, if initialized
    fn context(&self) -> Option<&ContextInfo>;

    /// Downcast to the concrete backend type
    fn as_any(&self) -> &dyn Any;

    /// Downcast to the mutable concrete backend type
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
