//! # Core Engine Module
//!
//! Shared abstractions used throughout the engine.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration for all engine subsystems

pub mod config;

pub use config::{
    AssetConfig, Config, ConfigError, EngineConfig, FrameConfig, MissingAssetPolicy, RendererConfig, WindowConfig,
};
