//! Core engine implementation
//!
//! The [`Engine`] owns the world, scene graph, asset manager and renderer and
//! drives them through a fixed per-frame order:
//!
//! 1. finished asset loads are bound into the cache
//! 2. systems run (`World::update`), skipped while paused
//! 3. the scene graph syncs and recomputes dirty world transforms
//! 4. the frame is submitted to the render backend
//!
//! Lifecycle: `Uninitialized → Initialized → Running ⇄ Paused → Stopped`,
//! with `Destroyed` reachable from any state and terminal.

use std::thread;

use log::{debug, info, trace, warn};
use thiserror::Error;

use crate::application::Application;
use crate::assets::{AssetError, AssetManager};
use crate::core::config::{ConfigError, EngineConfig};
use crate::ecs::{Entity, EntityRecord, World};
use crate::foundation::time::{Stopwatch, Timer};
use crate::render::{Camera, HeadlessBackend, RenderBackend, RenderError, Renderer};
use crate::scene::{SceneError, SceneGraph};

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Created; no rendering context yet
    Uninitialized,
    /// Rendering context created
    Initialized,
    /// Ticking
    Running,
    /// Ticking without running systems
    Paused,
    /// Stopped; may be started again
    Stopped,
    /// Resources released; every further call fails
    Destroyed,
}

/// Counts for one engine tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Index of the frame within the engine's lifetime
    pub frame_index: u64,
    /// Delta handed to systems, after clamping
    pub delta_time: f32,
    /// Live entities after the update
    pub entity_count: usize,
    /// World transforms recomputed this frame
    pub transforms_updated: usize,
    /// Draws submitted
    pub draw_calls: usize,
    /// Draws that used the placeholder mesh
    pub placeholders: usize,
    /// Renderables left out
    pub skipped: usize,
}

/// Main engine struct
///
/// The engine is the composition root: it owns every subsystem and there is
/// no global state.
pub struct Engine {
    world: World,
    scene: SceneGraph,
    assets: AssetManager,
    renderer: Renderer,
    timer: Timer,
    config: EngineConfig,
    state: EngineState,
    quit_requested: bool,
}

impl Engine {
    /// Create a new engine instance over a render backend
    pub fn new(config: EngineConfig, backend: Box<dyn RenderBackend>) -> Result<Self, EngineError> {
        config.validate()?;
        info!("Creating engine '{}' ({} backend)", config.window.title, backend.name());

        let assets = AssetManager::new(&config.assets)?;
        let renderer = Renderer::new(backend, &config.renderer);

        Ok(Self {
            world: World::new(),
            scene: SceneGraph::new(),
            assets,
            renderer,
            timer: Timer::new(),
            config,
            state: EngineState::Uninitialized,
            quit_requested: false,
        })
    }

    /// Create an engine that renders to memory
    pub fn headless(config: EngineConfig) -> Result<Self, EngineError> {
        Self::new(config, Box::new(HeadlessBackend::new()))
    }

    /// Create the rendering context.
    ///
    /// On failure the engine stays uninitialized and the call may be retried,
    /// e.g. after [`Engine::resize`] gives it a usable surface.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Destroyed => return Err(EngineError::Destroyed),
            EngineState::Uninitialized => {}
            _ => {
                warn!("Engine already initialized");
                return Err(EngineError::AlreadyInitialized);
            }
        }

        let (width, height) = (self.config.window.width, self.config.window.height);
        self.renderer
            .initialize(width, height)
            .map_err(EngineError::ResourceCreation)?;
        self.state = EngineState::Initialized;
        info!("Engine initialized ({}x{})", width, height);
        Ok(())
    }

    /// Enter the running state from `Initialized` or `Stopped`
    pub fn start(&mut self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Destroyed => Err(EngineError::Destroyed),
            EngineState::Uninitialized => Err(EngineError::NotInitialized),
            EngineState::Running | EngineState::Paused => {
                warn!("Engine already running; start ignored");
                Ok(())
            }
            EngineState::Initialized | EngineState::Stopped => {
                self.state = EngineState::Running;
                self.quit_requested = false;
                self.timer.reset_delta();
                info!("Engine started");
                Ok(())
            }
        }
    }

    /// Leave the running state. Stopping an engine that is not running only
    /// warns.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Destroyed => Err(EngineError::Destroyed),
            EngineState::Running | EngineState::Paused => {
                self.state = EngineState::Stopped;
                info!("Engine stopped after {} frames", self.timer.frame_count());
                Ok(())
            }
            _ => {
                warn!("Engine is not running; stop ignored");
                Ok(())
            }
        }
    }

    /// Suspend systems; frames keep rendering
    pub fn pause(&mut self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Destroyed => Err(EngineError::Destroyed),
            EngineState::Running => {
                self.state = EngineState::Paused;
                info!("Engine paused");
                Ok(())
            }
            state => {
                warn!("Cannot pause engine in state {:?}", state);
                Ok(())
            }
        }
    }

    /// Resume systems after [`Engine::pause`]
    pub fn resume(&mut self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Destroyed => Err(EngineError::Destroyed),
            EngineState::Paused => {
                self.state = EngineState::Running;
                self.timer.reset_delta();
                info!("Engine resumed");
                Ok(())
            }
            state => {
                warn!("Cannot resume engine in state {:?}", state);
                Ok(())
            }
        }
    }

    /// Stop if running, release GPU resources and the context, and shut the
    /// asset loaders down. The engine cannot be used afterwards.
    pub fn destroy(&mut self) -> Result<(), EngineError> {
        if self.state == EngineState::Destroyed {
            return Err(EngineError::Destroyed);
        }
        if matches!(self.state, EngineState::Running | EngineState::Paused) {
            self.stop()?;
        }
        self.release_resources();
        self.state = EngineState::Destroyed;
        info!("Engine destroyed");
        Ok(())
    }

    /// Run one frame with an explicit delta (seconds).
    ///
    /// The delta is clamped to `[0, max_delta_time]`; non-finite values
    /// count as zero.
    pub fn tick(&mut self, delta_time: f32) -> Result<FrameStats, EngineError> {
        match self.state {
            EngineState::Running | EngineState::Paused => {}
            EngineState::Destroyed => return Err(EngineError::Destroyed),
            _ => return Err(EngineError::NotRunning),
        }

        let max_delta = self.config.frame.max_delta_time;
        let delta_time = if delta_time.is_finite() { delta_time.clamp(0.0, max_delta) } else { 0.0 };
        trace!("Tick dt={:.4}", delta_time);
        let frame_index = self.timer.frame_count();
        self.timer.advance(delta_time);

        let bound = self.assets.update();
        if bound > 0 {
            debug!("Bound {} finished asset loads", bound);
        }

        if self.state == EngineState::Running {
            self.world.update(delta_time);
        }

        let transforms_updated = self.scene.update_transforms(&self.world);

        let render = self
            .renderer
            .render(&self.world, &mut self.scene, &mut self.assets)
            .map_err(EngineError::Render)?;

        Ok(FrameStats {
            frame_index,
            delta_time,
            entity_count: self.world.entity_count(),
            transforms_updated,
            draw_calls: render.draw_calls,
            placeholders: render.placeholders,
            skipped: render.skipped,
        })
    }

    /// Drive `app` until it requests a quit or the engine is stopped.
    ///
    /// Initializes the engine if needed, calls `on_start`, then ticks with
    /// wall-clock deltas, pacing frames to `target_fps` when one is set.
    pub fn run<A: Application>(&mut self, app: &mut A) -> Result<(), EngineError> {
        if self.state == EngineState::Destroyed {
            return Err(EngineError::Destroyed);
        }
        if self.state == EngineState::Uninitialized {
            self.initialize()?;
        }
        app.on_start(self).map_err(|e| EngineError::Application(format!("on_start: {}", e)))?;
        self.start()?;

        let frame_budget = self.config.frame.frame_budget();
        info!("Starting main loop...");

        let mut result = Ok(());
        while self.is_running() && !self.quit_requested {
            let frame_clock = Stopwatch::start_new();
            let delta_time = self.timer.measure_delta();

            if let Err(e) = app.on_update(self, delta_time) {
                result = Err(EngineError::Application(format!("on_update: {}", e)));
                break;
            }
            if let Err(e) = self.tick(delta_time) {
                result = Err(e);
                break;
            }

            if let Some(budget) = frame_budget {
                let spent = frame_clock.elapsed();
                if spent < budget {
                    thread::sleep(budget - spent);
                }
            }
        }

        app.on_stop(self);
        if self.is_running() {
            self.stop()?;
        }
        info!("Main loop finished ({:.1} average fps)", self.timer.average_fps());
        result
    }

    /// Ask [`Engine::run`] to finish after the current frame
    pub fn request_quit(&mut self) {
        debug!("Engine quit requested");
        self.quit_requested = true;
    }

    /// Resize the drawing surface
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        if self.state == EngineState::Destroyed {
            return Err(EngineError::Destroyed);
        }
        self.config.window.width = width;
        self.config.window.height = height;
        self.renderer.resize(width, height).map_err(EngineError::Render)
    }

    /// Create an entity; deferred to the end of the pass while systems run
    pub fn create_entity(&mut self, name: Option<&str>) -> Result<Entity, EngineError> {
        self.ensure_alive()?;
        Ok(self.world.create_entity(name))
    }

    /// Destroy an entity. Its scene node is dropped at the next sync and its
    /// children become roots.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<bool, EngineError> {
        self.ensure_alive()?;
        Ok(self.world.destroy_entity(entity))
    }

    /// Record of a live entity
    pub fn entity(&self, entity: Entity) -> Option<&EntityRecord> {
        self.world.entity(entity)
    }

    /// Parent `child` under `parent` (or make it a root), picking up any
    /// entities that gained a transform since the last frame first.
    pub fn attach(&mut self, child: Entity, parent: Option<Entity>) -> Result<(), EngineError> {
        self.ensure_alive()?;
        self.scene.sync(&self.world);
        Ok(self.scene.attach(&self.world, child, parent)?)
    }

    fn ensure_alive(&self) -> Result<(), EngineError> {
        if self.state == EngineState::Destroyed {
            Err(EngineError::Destroyed)
        } else {
            Ok(())
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Whether frames are being ticked (running or paused)
    pub fn is_running(&self) -> bool {
        matches!(self.state, EngineState::Running | EngineState::Paused)
    }

    /// Get the ECS world
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Get the scene graph
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Get mutable access to the scene graph
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// Get the asset manager
    pub fn assets(&self) -> &AssetManager {
        &self.assets
    }

    /// Get mutable access to the asset manager
    pub fn assets_mut(&mut self) -> &mut AssetManager {
        &mut self.assets
    }

    /// Get the renderer
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Get the active camera
    pub fn camera(&self) -> &Camera {
        self.renderer.camera()
    }

    /// Get mutable access to the active camera
    pub fn camera_mut(&mut self) -> &mut Camera {
        self.renderer.camera_mut()
    }

    /// Frame timing
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn release_resources(&mut self) {
        self.renderer.destroy();
        self.assets.shutdown();
        self.scene.clear();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.state != EngineState::Destroyed {
            self.release_resources();
        }
    }
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine has not been initialized
    #[error("Engine not initialized")]
    NotInitialized,

    /// `initialize` was called more than once
    #[error("Engine already initialized")]
    AlreadyInitialized,

    /// The engine was destroyed
    #[error("Engine destroyed")]
    Destroyed,

    /// The operation needs a running engine
    #[error("Engine not running")]
    NotRunning,

    /// The rendering context could not be created
    #[error("Resource creation failed: {0}")]
    ResourceCreation(RenderError),

    /// A frame failed to render
    #[error("Rendering error: {0}")]
    Render(RenderError),

    /// Application callback failed
    #[error("Application error: {0}")]
    Application(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Asset system error
    #[error("Asset system error: {0}")]
    Asset(#[from] AssetError),

    /// Scene graph error
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}
