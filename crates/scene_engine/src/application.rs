//! Application trait and lifecycle management

use crate::assets::AssetError;
use crate::ecs::EcsError;
use crate::engine::{Engine, EngineError};
use crate::scene::SceneError;
use thiserror::Error;

/// Application lifecycle trait
///
/// Implement this trait to drive the engine with [`Engine::run`].
pub trait Application {
    /// Called once after the engine is initialized and before the first
    /// frame. Use this to build the initial scene and register systems.
    fn on_start(&mut self, _engine: &mut Engine) -> Result<(), AppError> {
        Ok(())
    }

    /// Called every frame before systems run.
    ///
    /// # Arguments
    /// * `engine` - Mutable reference to the engine
    /// * `delta_time` - Time since last frame in seconds
    fn on_update(&mut self, engine: &mut Engine, delta_time: f32) -> Result<(), AppError>;

    /// Called once when the loop ends
    fn on_stop(&mut self, _engine: &mut Engine) {}
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Engine error propagated to application level
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Entity or component misuse
    #[error("ECS error: {0}")]
    Ecs(#[from] EcsError),

    /// Invalid scene graph operation
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Asset loading error
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Custom application error
    #[error("Application error: {0}")]
    Custom(String),
}
