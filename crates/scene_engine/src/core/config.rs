//! # Unified Configuration System
//!
//! All engine settings live here, grouped by subsystem. Every structure is
//! serde-serializable and loadable from TOML or RON through [`Config`].
//!
//! ## Configuration Categories
//!
//! - **Window Config**: drawing surface title and size
//! - **Frame Config**: frame pacing and delta clamping
//! - **Renderer Config**: render state defaults and missing-asset policy
//! - **Asset Config**: search paths, cache capacity, loader threads

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};

/// Drawing surface configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Surface title
    pub title: String,
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Scene Engine".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Frame loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Target frames per second for pacing; 0 runs unthrottled
    pub target_fps: u32,
    /// Largest delta (seconds) handed to systems in one tick
    pub max_delta_time: f32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            max_delta_time: 0.25,
        }
    }
}

impl FrameConfig {
    /// Wall-clock budget of one frame, `None` when unthrottled
    pub fn frame_budget(&self) -> Option<Duration> {
        (self.target_fps > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(self.target_fps)))
    }
}

/// What the renderer does with a renderable whose mesh is not loaded yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingAssetPolicy {
    /// Submit the draw with the backend's placeholder mesh
    Placeholder,
    /// Leave the draw out of this frame
    Skip,
}

/// # Renderer Configuration
///
/// Defaults for the render state applied at initialization and for the
/// default camera projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Color the frame is cleared to (RGBA)
    pub clear_color: [f32; 4],
    /// Enable depth testing (less-or-equal)
    pub depth_test: bool,
    /// Cull back faces (counter-clockwise front faces)
    pub cull_back_faces: bool,
    /// Handling of renderables whose mesh is missing
    pub missing_asset_policy: MissingAssetPolicy,
    /// Vertical field of view of the default camera in degrees
    pub fov_degrees: f32,
    /// Near clipping plane of the default camera
    pub near_plane: f32,
    /// Far clipping plane of the default camera
    pub far_plane: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.1, 0.1, 0.1, 1.0],
            depth_test: true,
            cull_back_faces: true,
            missing_asset_policy: MissingAssetPolicy::Placeholder,
            fov_degrees: 45.0,
            near_plane: 0.1,
            far_plane: 1000.0,
        }
    }
}

/// # Asset Configuration
///
/// Configuration for asset loading and caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directories searched, in order, by the built-in file loaders
    pub search_paths: Vec<String>,
    /// Maximum number of entries kept in the asset cache
    pub cache_capacity: usize,
    /// Worker threads for asynchronous loads; 0 loads inline on request
    pub loader_threads: usize,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            search_paths: vec!["resources".to_string()],
            cache_capacity: 1000,
            loader_threads: 2,
        }
    }
}

impl AssetConfig {
    /// Set asset search paths
    pub fn with_search_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Set cache capacity
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the number of loader threads
    pub fn with_loader_threads(mut self, threads: usize) -> Self {
        self.loader_threads = threads;
        self
    }
}

/// # Complete Engine Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default log filter (overridden by `RUST_LOG`)
    pub log_level: String,
    /// Drawing surface configuration
    pub window: WindowConfig,
    /// Frame loop configuration
    pub frame: FrameConfig,
    /// Renderer configuration
    pub renderer: RendererConfig,
    /// Asset system configuration
    pub assets: AssetConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            window: WindowConfig::default(),
            frame: FrameConfig::default(),
            renderer: RendererConfig::default(),
            assets: AssetConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration with defaults and the given surface title
    pub fn new(title: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.window.title = title.into();
        config
    }

    /// Set surface size
    pub fn with_surface_size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    /// Set target FPS (`None` for unthrottled)
    pub fn with_target_fps(mut self, fps: Option<u32>) -> Self {
        self.frame.target_fps = fps.unwrap_or(0);
        self
    }

    /// Replace the asset configuration
    pub fn with_assets(mut self, assets: AssetConfig) -> Self {
        self.assets = assets;
        self
    }

    /// Set the missing-asset policy
    pub fn with_missing_asset_policy(mut self, policy: MissingAssetPolicy) -> Self {
        self.renderer.missing_asset_policy = policy;
        self
    }

    /// Validate the entire configuration
    ///
    /// The surface size is deliberately not checked here: an unusable surface
    /// is reported by the renderer when the engine initializes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.title.is_empty() {
            return Err(ConfigError::Invalid("window title cannot be empty".to_string()));
        }
        if self.assets.cache_capacity == 0 {
            return Err(ConfigError::Invalid("asset cache capacity must be at least 1".to_string()));
        }
        if !(self.frame.max_delta_time > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_delta_time must be positive, got {}",
                self.frame.max_delta_time
            )));
        }
        let renderer = &self.renderer;
        if !(renderer.near_plane > 0.0 && renderer.far_plane > renderer.near_plane) {
            return Err(ConfigError::Invalid(format!(
                "clip planes must satisfy 0 < near < far, got near={} far={}",
                renderer.near_plane, renderer.far_plane
            )));
        }
        Ok(())
    }
}

impl Config for EngineConfig {}
