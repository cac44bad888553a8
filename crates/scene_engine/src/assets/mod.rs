//! Asset management system
//!
//! - **Cache**: bounded LRU map from path to loaded value
//! - **Loaders**: pluggable path → value conversion, run off the main thread
//! - **Manager**: request/poll API binding finished loads into the cache

pub mod cache;
pub mod handle;
pub mod loader;
pub mod manager;
pub mod pool;

pub use cache::AssetCache;
pub use handle::{LoadHandle, LoadState};
pub use loader::{AssetData, AssetLoader, BinaryLoader, SearchPaths, TextLoader};
pub use manager::AssetManager;
pub use pool::LoaderPool;

use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// No search path contains the asset
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// IO error during asset loading
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A loader failed to produce the asset
    #[error("Failed to load {path}: {reason}")]
    LoaderFailed {
        /// Requested path
        path: String,
        /// Loader's explanation
        reason: String,
    },

    /// The asset manager has been shut down
    #[error("Asset manager has been shut down")]
    ShutDown,
}
