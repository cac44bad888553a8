//! Headless backend
//!
//! Fulfils the backend contract without a GPU: uploads are validated and
//! tracked, frames are recorded in memory. Used by tests, tools and servers
//! that need the full frame loop without a window.

use std::any::Any;
use std::collections::{HashMap, VecDeque};

use log::{debug, info, trace};

use crate::render::backend::{ContextInfo, FrameSubmission, GpuDraw, MeshHandle, RenderBackend};
use crate::render::mesh::Mesh;
use crate::render::state::RenderState;
use crate::render::{RenderError, RenderResult};

const DEFAULT_FRAME_HISTORY: usize = 64;

/// Bookkeeping for an uploaded mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshRecord {
    /// Vertex count
    pub vertex_count: usize,
    /// Index count
    pub index_count: usize,
    /// Bytes of vertex and index data
    pub byte_size: usize,
}

/// A frame as the backend received it
#[derive(Debug, Clone)]
pub struct RecordedFrame {
    /// Frame number from the submission
    pub frame_index: u64,
    /// Render state in effect
    pub state: RenderState,
    /// Draws in submission order
    pub draws: Vec<GpuDraw>,
}

/// In-memory rendering backend
#[derive(Debug)]
pub struct HeadlessBackend {
    context: Option<ContextInfo>,
    state: Option<RenderState>,
    meshes: HashMap<MeshHandle, MeshRecord>,
    next_handle: u64,
    frames: VecDeque<RecordedFrame>,
    frame_history: usize,
    frames_rendered: u64,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    /// Create an uninitialized backend
    pub fn new() -> Self {
        Self {
            context: None,
            state: None,
            meshes: HashMap::new(),
            next_handle: 1,
            frames: VecDeque::new(),
            frame_history: DEFAULT_FRAME_HISTORY,
            frames_rendered: 0,
        }
    }

    /// Recorded frames, oldest first
    pub fn frames(&self) -> impl Iterator<Item = &RecordedFrame> {
        self.frames.iter()
    }

    /// Most recent frame
    pub fn last_frame(&self) -> Option<&RecordedFrame> {
        self.frames.back()
    }

    /// Frames rendered since initialization, including dropped history
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Number of meshes currently uploaded
    pub fn live_mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Upload record for a handle
    pub fn mesh(&self, handle: MeshHandle) -> Option<&MeshRecord> {
        self.meshes.get(&handle)
    }

    /// State applied at initialization or the latest frame
    pub fn state(&self) -> Option<&RenderState> {
        self.state.as_ref()
    }

    fn require_context(&self) -> RenderResult<()> {
        if self.context.is_some() {
            Ok(())
        } else {
            Err(RenderError::NotInitialized)
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn initialize(&mut self, width: u32, height: u32, state: &RenderState) -> RenderResult<ContextInfo> {
        if self.context.is_some() {
            return Err(RenderError::InitializationFailed("context already created".to_string()));
        }
        if width == 0 || height == 0 {
            return Err(RenderError::ResourceCreationFailed(format!(
                "cannot create a {}x{} drawing surface",
                width, height
            )));
        }

        let info = ContextInfo {
            backend: self.name().to_string(),
            vendor: "none".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            width,
            height,
        };
        self.context = Some(info.clone());
        self.state = Some(*state);
        info!("Headless context created ({}x{})", width, height);
        Ok(info)
    }

    fn upload_mesh(&mut self, mesh: &Mesh) -> RenderResult<MeshHandle> {
        self.require_context()?;
        mesh.validate()?;

        let handle = MeshHandle(self.next_handle);
        self.next_handle += 1;
        self.meshes.insert(
            handle,
            MeshRecord {
                vertex_count: mesh.vertices.len(),
                index_count: mesh.index_count(),
                byte_size: mesh.vertex_bytes().len() + mesh.index_bytes().len(),
            },
        );
        trace!("Uploaded mesh {:?} ({} indices)", handle, mesh.index_count());
        Ok(handle)
    }

    fn release_mesh(&mut self, handle: MeshHandle) -> bool {
        self.meshes.remove(&handle).is_some()
    }

    fn render(&mut self, frame: &FrameSubmission<'_>) -> RenderResult<()> {
        self.require_context()?;
        if let Some(draw) = frame.draws.iter().find(|draw| !self.meshes.contains_key(&draw.mesh)) {
            return Err(RenderError::RenderingFailed(format!(
                "draw for {:?} references unknown mesh {:?}",
                draw.entity, draw.mesh
            )));
        }

        self.state = Some(*frame.state);
        self.frames_rendered += 1;
        if self.frame_history > 0 {
            if self.frames.len() == self.frame_history {
                self.frames.pop_front();
            }
            self.frames.push_back(RecordedFrame {
                frame_index: frame.frame_index,
                state: *frame.state,
                draws: frame.draws.to_vec(),
            });
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let context = self.context.as_mut().ok_or(RenderError::NotInitialized)?;
        context.width = width;
        context.height = height;
        if let Some(state) = self.state.as_mut() {
            state.set_viewport(width, height);
        }
        debug!("Headless surface resized to {}x{}", width, height);
        Ok(())
    }

    fn destroy(&mut self) {
        if self.context.take().is_some() {
            debug!("Headless context destroyed ({} meshes released)", self.meshes.len());
        }
        self.meshes.clear();
        self.state = None;
    }

    fn context(&self) -> Option<&ContextInfo> {
        self.context.as_ref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initialized() -> HeadlessBackend {
        let mut backend = HeadlessBackend::new();
        backend.initialize(64, 48, &RenderState::default()).unwrap();
        backend
    }

    #[test]
    fn test_zero_surface_fails_and_retry_succeeds() {
        let mut backend = HeadlessBackend::new();
        let result = backend.initialize(0, 480, &RenderState::default());
        assert!(matches!(result, Err(RenderError::ResourceCreationFailed(_))));
        assert!(backend.context().is_none());

        let info = backend.initialize(640, 480, &RenderState::default()).unwrap();
        assert_eq!((info.width, info.height), (640, 480));
        assert_eq!(info.backend, "headless");
    }

    #[test]
    fn test_calls_before_initialize_fail() {
        let mut backend = HeadlessBackend::new();
        assert!(matches!(backend.upload_mesh(&Mesh::cube()), Err(RenderError::NotInitialized)));
        assert!(matches!(backend.resize(1, 1), Err(RenderError::NotInitialized)));
    }

    #[test]
    fn test_upload_and_release_track_live_meshes() {
        let mut backend = initialized();
        let cube = backend.upload_mesh(&Mesh::cube()).unwrap();
        let tri = backend.upload_mesh(&Mesh::triangle()).unwrap();
        assert_ne!(cube, tri);
        assert_eq!(backend.live_mesh_count(), 2);
        assert_eq!(backend.mesh(cube).map(|m| m.index_count), Some(36));

        assert!(backend.release_mesh(cube));
        assert!(!backend.release_mesh(cube));
        assert_eq!(backend.live_mesh_count(), 1);

        backend.destroy();
        assert_eq!(backend.live_mesh_count(), 0);
        assert!(backend.context().is_none());
    }

    #[test]
    fn test_frame_history_is_bounded() {
        let mut backend = initialized();
        backend.frame_history = 2;
        let state = RenderState::default();
        for frame_index in 0..5 {
            let frame = FrameSubmission {
                frame_index,
                state: &state,
                view: crate::foundation::math::Mat4::identity(),
                projection: crate::foundation::math::Mat4::identity(),
                draws: &[],
            };
            backend.render(&frame).unwrap();
        }

        assert_eq!(backend.frames_rendered(), 5);
        let kept: Vec<u64> = backend.frames().map(|f| f.frame_index).collect();
        assert_eq!(kept, vec![3, 4]);
    }
}
