//! # Scene Engine
//!
//! Core of a game engine/editor: an entity-component world, a scene graph
//! with cached world transforms, an LRU asset cache fed by background
//! loaders, and a backend-agnostic render pipeline.
//!
//! ## Features
//!
//! - **ECS Architecture**: generational entity ids, dense per-type component
//!   storage with change ticks, systems in registration order
//! - **Scene Graph**: parent/child hierarchy with dirty-flag transform caching
//! - **Asset Management**: recency-ordered cache and asynchronous loads
//! - **Render Pipeline**: depth-first draw submission over a pluggable backend,
//!   with an in-memory headless backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn on_start(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         let cube = engine.create_entity(Some("cube"))?;
//!         engine.world_mut().add_component(cube, TransformComponent::identity())?;
//!         engine.world_mut().add_component(cube, RenderableComponent::new("cube"))?;
//!         Ok(())
//!     }
//!
//!     fn on_update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
//!         if engine.timer().total_time() > 5.0 {
//!             engine.request_quit();
//!         }
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     scene_engine::foundation::logging::init_with_level(&config.log_level);
//!     let mut engine = Engine::headless(config)?;
//!     engine.assets_mut().insert("cube", Mesh::cube());
//!     engine.run(&mut MyApp)?;
//!     engine.destroy()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod config;
pub mod core;
pub mod foundation;

pub mod assets;
pub mod ecs;
pub mod render;
pub mod scene;

mod application;
mod engine;

pub use application::{AppError, Application};
pub use crate::core::config::EngineConfig;
pub use engine::{Engine, EngineError, EngineState, FrameStats};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetManager, LoadHandle, LoadState},
        core::config::{Config, EngineConfig, MissingAssetPolicy},
        ecs::{
            components::{RenderableComponent, TransformComponent},
            Component, Entity, System, World,
        },
        foundation::{
            math::{Mat4, Quat, Transform, Vec3},
            time::{Stopwatch, Timer},
        },
        render::{Camera, HeadlessBackend, Mesh, RenderBackend, Renderer},
        scene::SceneGraph,
        AppError, Application, Engine, EngineError, EngineState,
    };
}
