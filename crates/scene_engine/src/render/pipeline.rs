//! # Render Pipeline
//!
//! The [`Renderer`] turns the scene into draw submissions for a
//! [`RenderBackend`]:
//!
//! 1. GPU meshes whose assets left the cache are released
//! 2. Dirty world transforms are recomputed
//! 3. Renderables are collected in depth-first scene order (disabled
//!    entities hide their whole sub-tree) and stably sorted by layer
//! 4. Meshes are uploaded on first use and the frame is submitted
//!
//! Renderables whose mesh is not in the asset cache are drawn with a
//! placeholder cube or left out, depending on [`MissingAssetPolicy`].

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, info, trace, warn};

use super::backend::{ContextInfo, FrameSubmission, GpuDraw, MeshHandle, RenderBackend};
use super::camera::Camera;
use super::mesh::Mesh;
use super::queue::{DrawCommand, ObjectUniforms, RenderQueue};
use super::state::RenderState;
use super::{RenderError, RenderResult};
use crate::assets::AssetManager;
use crate::core::config::{MissingAssetPolicy, RendererConfig};
use crate::ecs::components::RenderableComponent;
use crate::ecs::World;
use crate::scene::SceneGraph;

/// Counts for one submitted frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Draws submitted to the backend
    pub draw_calls: usize,
    /// Draws that used the placeholder mesh
    pub placeholders: usize,
    /// Renderables left out of the frame
    pub skipped: usize,
}

struct Upload {
    handle: MeshHandle,
    source: Arc<Mesh>,
}

/// High-level renderer over a backend
pub struct Renderer {
    backend: Box<dyn RenderBackend>,
    config: RendererConfig,
    state: RenderState,
    camera: Camera,
    uploads: HashMap<String, Upload>,
    rejected: HashMap<String, Arc<Mesh>>,
    placeholder: Option<MeshHandle>,
    frame_index: u64,
}

impl Renderer {
    /// Create a renderer; no context exists until [`Renderer::initialize`]
    pub fn new(backend: Box<dyn RenderBackend>, config: &RendererConfig) -> Self {
        Self {
            backend,
            config: config.clone(),
            state: RenderState::from_config(config, 0, 0),
            camera: Camera::from_config(config, 1.0),
            uploads: HashMap::new(),
            rejected: HashMap::new(),
            placeholder: None,
            frame_index: 0,
        }
    }

    /// Create the rendering context for a surface and upload the placeholder
    /// mesh. On failure the renderer stays uninitialized and may be retried.
    pub fn initialize(&mut self, width: u32, height: u32) -> RenderResult<ContextInfo> {
        if self.is_initialized() {
            return Err(RenderError::InitializationFailed("renderer already initialized".to_string()));
        }

        let state = RenderState::from_config(&self.config, width, height);
        let info = self.backend.initialize(width, height, &state)?;
        info!(
            "Rendering context: {} (vendor: {}, version: {}) {}x{}",
            info.backend, info.vendor, info.version, info.width, info.height
        );

        match self.backend.upload_mesh(&Mesh::cube()) {
            Ok(handle) => self.placeholder = Some(handle),
            Err(e) => {
                self.backend.destroy();
                return Err(e);
            }
        }

        self.state = state;
        self.camera.set_aspect_ratio(state.viewport.aspect_ratio());
        Ok(info)
    }

    /// Whether a context exists
    pub fn is_initialized(&self) -> bool {
        self.placeholder.is_some()
    }

    /// Collect the frame's draw commands without submitting them.
    ///
    /// Reads cached world transforms, so call after the scene's transforms
    /// are up to date.
    pub fn build_queue(&self, world: &World, scene: &SceneGraph, assets: &mut AssetManager) -> RenderQueue {
        let policy = self.config.missing_asset_policy;
        let mut queue = RenderQueue::new();

        scene.traverse(|entity, node| {
            if !world.is_enabled(entity) {
                return false;
            }
            let Some(renderable) = world.get_component::<RenderableComponent>(entity) else {
                return true;
            };
            if !renderable.should_render() {
                return true;
            }

            let mesh = assets.get::<Mesh>(&renderable.mesh);
            if mesh.is_none() && policy == MissingAssetPolicy::Skip {
                trace!("Skipping {:?}: mesh '{}' not loaded", entity, renderable.mesh);
                queue.record_skip();
                return true;
            }

            queue.push(DrawCommand {
                entity,
                mesh_key: renderable.mesh.clone(),
                mesh,
                model: node.cached_world_transform().to_matrix(),
                color: renderable.color,
                layer: renderable.render_layer,
            });
            true
        });

        queue.sort_by_layer();
        queue
    }

    /// Draw one frame of the scene
    pub fn render(&mut self, world: &World, scene: &mut SceneGraph, assets: &mut AssetManager) -> RenderResult<RenderStats> {
        let placeholder = self.placeholder.ok_or(RenderError::NotInitialized)?;

        for key in assets.take_released() {
            self.release_upload(&key);
        }

        scene.update_transforms(world);
        let queue = self.build_queue(world, scene, assets);
        let view = self.camera.view_matrix();
        let projection = self.camera.projection_matrix();
        let view_projection = projection * view;

        let mut stats = RenderStats {
            skipped: queue.skipped_count(),
            ..RenderStats::default()
        };
        let mut draws = Vec::with_capacity(queue.len());
        for command in queue.commands() {
            let uploaded = command
                .mesh
                .as_ref()
                .and_then(|mesh| self.mesh_handle(&command.mesh_key, mesh));
            let (mesh, is_placeholder) = match uploaded {
                Some(handle) => (handle, false),
                None if self.config.missing_asset_policy == MissingAssetPolicy::Skip => {
                    stats.skipped += 1;
                    continue;
                }
                None => (placeholder, true),
            };
            if is_placeholder {
                stats.placeholders += 1;
            }
            draws.push(GpuDraw {
                entity: command.entity,
                mesh,
                uniforms: ObjectUniforms::new(&command.model, &view_projection, command.color),
                placeholder: is_placeholder,
            });
        }
        stats.draw_calls = draws.len();

        let frame = FrameSubmission {
            frame_index: self.frame_index,
            state: &self.state,
            view,
            projection,
            draws: &draws,
        };
        if let Err(e) = self.backend.render(&frame) {
            error!("Frame {} failed: {}", self.frame_index, e);
            return Err(e);
        }
        self.frame_index += 1;
        Ok(stats)
    }

    /// Resize the viewport, camera aspect ratio and backend surface.
    /// Zero-sized surfaces (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            debug!("Ignoring resize to {}x{}", width, height);
            return Ok(());
        }
        self.state.set_viewport(width, height);
        self.camera.set_aspect_ratio(self.state.viewport.aspect_ratio());
        if self.is_initialized() {
            self.backend.resize(width, height)?;
        }
        Ok(())
    }

    /// Release every uploaded mesh and the context. Idempotent.
    pub fn destroy(&mut self) {
        let released = self.uploads.len();
        for (_, upload) in self.uploads.drain() {
            self.backend.release_mesh(upload.handle);
        }
        self.rejected.clear();
        if let Some(handle) = self.placeholder.take() {
            self.backend.release_mesh(handle);
            info!("Renderer destroyed ({} meshes released)", released);
        }
        self.backend.destroy();
    }

    /// Camera used for the next frame
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Current fixed-function state
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Backend in use
    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    /// Context of the backend, if initialized
    pub fn context(&self) -> Option<&ContextInfo> {
        self.backend.context()
    }

    /// Number of asset meshes on the GPU, excluding the placeholder
    pub fn uploaded_mesh_count(&self) -> usize {
        self.uploads.len()
    }

    /// Frames submitted so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    fn mesh_handle(&mut self, key: &str, mesh: &Arc<Mesh>) -> Option<MeshHandle> {
        match self.uploads.get(key) {
            Some(upload) if Arc::ptr_eq(&upload.source, mesh) => return Some(upload.handle),
            // Same key, new mesh data
            Some(_) => self.release_upload(key),
            None => {}
        }
        if self.rejected.get(key).is_some_and(|rejected| Arc::ptr_eq(rejected, mesh)) {
            return None;
        }

        match self.backend.upload_mesh(mesh) {
            Ok(handle) => {
                self.uploads.insert(
                    key.to_string(),
                    Upload {
                        handle,
                        source: Arc::clone(mesh),
                    },
                );
                trace!("Uploaded mesh '{}'", key);
                Some(handle)
            }
            Err(e) => {
                warn!("Mesh '{}' could not be uploaded: {}", key, e);
                self.rejected.insert(key.to_string(), Arc::clone(mesh));
                None
            }
        }
    }

    fn release_upload(&mut self, key: &str) {
        self.rejected.remove(key);
        if let Some(upload) = self.uploads.remove(key) {
            self.backend.release_mesh(upload.handle);
            trace!("Released mesh '{}'", key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AssetConfig;
    use crate::ecs::components::TransformComponent;
    use crate::ecs::Entity;
    use crate::foundation::math::Vec3;
    use crate::render::backends::HeadlessBackend;
    use approx::assert_relative_eq;

    fn renderer(policy: MissingAssetPolicy) -> Renderer {
        let config = RendererConfig {
            missing_asset_policy: policy,
            ..RendererConfig::default()
        };
        let mut renderer = Renderer::new(Box::new(HeadlessBackend::new()), &config);
        renderer.initialize(800, 600).unwrap();
        renderer
    }

    fn assets(capacity: usize) -> AssetManager {
        let config = AssetConfig::default().with_cache_capacity(capacity).with_loader_threads(0);
        AssetManager::new(&config).unwrap()
    }

    fn spawn(world: &mut World, position: Vec3, mesh: &str) -> Entity {
        let entity = world.create_entity(None);
        world.add_component(entity, TransformComponent::from_position(position)).unwrap();
        world.add_component(entity, RenderableComponent::new(mesh)).unwrap();
        entity
    }

    fn headless(renderer: &Renderer) -> &HeadlessBackend {
        renderer.backend().as_any().downcast_ref::<HeadlessBackend>().unwrap()
    }

    #[test]
    fn test_render_before_initialize_fails() {
        let mut renderer = Renderer::new(Box::new(HeadlessBackend::new()), &RendererConfig::default());
        let result = renderer.render(&World::new(), &mut SceneGraph::new(), &mut assets(4));
        assert_eq!(result, Err(RenderError::NotInitialized));
    }

    #[test]
    fn test_failed_initialize_can_be_retried() {
        let mut renderer = Renderer::new(Box::new(HeadlessBackend::new()), &RendererConfig::default());
        assert!(renderer.initialize(0, 0).is_err());
        assert!(!renderer.is_initialized());

        renderer.initialize(320, 240).unwrap();
        assert!(renderer.is_initialized());
        assert_relative_eq!(renderer.camera().aspect, 320.0 / 240.0);
    }

    #[test]
    fn test_draws_follow_scene_order_with_world_transforms() {
        let mut world = World::new();
        let mut scene = SceneGraph::new();
        let mut assets = assets(4);
        assets.insert("cube", Mesh::cube());

        let parent = spawn(&mut world, Vec3::new(5.0, 0.0, 0.0), "cube");
        let child = spawn(&mut world, Vec3::new(1.0, 0.0, 0.0), "cube");
        scene.sync(&world);
        scene.attach(&world, child, Some(parent)).unwrap();

        let mut renderer = renderer(MissingAssetPolicy::Placeholder);
        let stats = renderer.render(&world, &mut scene, &mut assets).unwrap();
        assert_eq!(stats, RenderStats { draw_calls: 2, placeholders: 0, skipped: 0 });

        let frame = headless(&renderer).last_frame().unwrap();
        let order: Vec<Entity> = frame.draws.iter().map(|draw| draw.entity).collect();
        assert_eq!(order, vec![parent, child]);
        assert_relative_eq!(frame.draws[1].uniforms.model[3][0], 6.0, epsilon = 1e-5);
        assert_eq!(renderer.uploaded_mesh_count(), 1);
    }

    #[test]
    fn test_missing_mesh_uses_placeholder() {
        let mut world = World::new();
        let mut scene = SceneGraph::new();
        spawn(&mut world, Vec3::zeros(), "not-loaded");

        let mut renderer = renderer(MissingAssetPolicy::Placeholder);
        let stats = renderer.render(&world, &mut scene, &mut assets(4)).unwrap();
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(stats.placeholders, 1);
        assert!(headless(&renderer).last_frame().unwrap().draws[0].placeholder);
    }

    #[test]
    fn test_missing_mesh_is_skipped_under_skip_policy() {
        let mut world = World::new();
        let mut scene = SceneGraph::new();
        spawn(&mut world, Vec3::zeros(), "not-loaded");

        let mut renderer = renderer(MissingAssetPolicy::Skip);
        let stats = renderer.render(&world, &mut scene, &mut assets(4)).unwrap();
        assert_eq!(stats, RenderStats { draw_calls: 0, placeholders: 0, skipped: 1 });
    }

    #[test]
    fn test_disabled_entity_hides_subtree() {
        let mut world = World::new();
        let mut scene = SceneGraph::new();
        let mut assets = assets(4);
        assets.insert("cube", Mesh::cube());

        let parent = spawn(&mut world, Vec3::zeros(), "cube");
        let child = spawn(&mut world, Vec3::zeros(), "cube");
        let other = spawn(&mut world, Vec3::zeros(), "cube");
        scene.sync(&world);
        scene.attach(&world, child, Some(parent)).unwrap();
        world.set_enabled(parent, false);

        let mut renderer = renderer(MissingAssetPolicy::Placeholder);
        renderer.render(&world, &mut scene, &mut assets).unwrap();
        let drawn: Vec<Entity> = headless(&renderer).last_frame().unwrap().draws.iter().map(|d| d.entity).collect();
        assert_eq!(drawn, vec![other]);
    }

    #[test]
    fn test_evicted_mesh_is_released_from_backend() {
        let mut world = World::new();
        let mut scene = SceneGraph::new();
        let mut assets = assets(1);
        spawn(&mut world, Vec3::zeros(), "a");
        spawn(&mut world, Vec3::zeros(), "b");

        let mut renderer = renderer(MissingAssetPolicy::Placeholder);
        assets.insert("a", Mesh::cube());
        renderer.render(&world, &mut scene, &mut assets).unwrap();
        assert_eq!(headless(&renderer).live_mesh_count(), 2);

        // Evicts "a"
        assets.insert("b", Mesh::triangle());
        let stats = renderer.render(&world, &mut scene, &mut assets).unwrap();
        assert_eq!(stats.placeholders, 1);
        assert_eq!(renderer.uploaded_mesh_count(), 1);
        assert_eq!(headless(&renderer).live_mesh_count(), 2);
    }

    #[test]
    fn test_replaced_mesh_is_uploaded_again() {
        let mut world = World::new();
        let mut scene = SceneGraph::new();
        let mut assets = assets(4);
        spawn(&mut world, Vec3::zeros(), "shape");

        let mut renderer = renderer(MissingAssetPolicy::Placeholder);
        assets.insert("shape", Mesh::cube());
        renderer.render(&world, &mut scene, &mut assets).unwrap();
        let first = headless(&renderer).last_frame().unwrap().draws[0].mesh;

        assets.insert("shape", Mesh::triangle());
        renderer.render(&world, &mut scene, &mut assets).unwrap();
        let second = headless(&renderer).last_frame().unwrap().draws[0].mesh;

        assert_ne!(first, second);
        assert_eq!(headless(&renderer).mesh(second).map(|m| m.index_count), Some(3));
        assert_eq!(headless(&renderer).live_mesh_count(), 2);
    }

    #[test]
    fn test_invalid_mesh_falls_back_to_placeholder() {
        let mut world = World::new();
        let mut scene = SceneGraph::new();
        let mut assets = assets(4);
        assets.insert("broken", Mesh::new(Vec::new(), vec![0, 1, 2]));
        spawn(&mut world, Vec3::zeros(), "broken");

        let mut renderer = renderer(MissingAssetPolicy::Placeholder);
        let stats = renderer.render(&world, &mut scene, &mut assets).unwrap();
        assert_eq!(stats.placeholders, 1);
        assert_eq!(renderer.uploaded_mesh_count(), 0);
    }

    #[test]
    fn test_resize_updates_viewport_and_aspect() {
        let mut renderer = renderer(MissingAssetPolicy::Placeholder);
        renderer.resize(1000, 500).unwrap();
        assert_eq!(renderer.state().viewport.width, 1000);
        assert_relative_eq!(renderer.camera().aspect, 2.0);
        assert_eq!(renderer.context().map(|c| c.width), Some(1000));

        renderer.resize(0, 0).unwrap();
        assert_eq!(renderer.state().viewport.width, 1000);
    }

    #[test]
    fn test_destroy_releases_everything() {
        let mut world = World::new();
        let mut scene = SceneGraph::new();
        let mut assets = assets(4);
        assets.insert("cube", Mesh::cube());
        spawn(&mut world, Vec3::zeros(), "cube");

        let mut renderer = renderer(MissingAssetPolicy::Placeholder);
        renderer.render(&world, &mut scene, &mut assets).unwrap();
        renderer.destroy();
        renderer.destroy();

        assert!(!renderer.is_initialized());
        assert_eq!(headless(&renderer).live_mesh_count(), 0);
        assert!(renderer.context().is_none());
    }
}
