//! Load handles

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::loader::AssetData;

/// Progress of an asynchronous load
#[derive(Debug, Clone)]
pub enum LoadState {
    /// The load has not completed, or has completed but not been bound yet
    Pending,
    /// The load finished; the value stays reachable through the handle even
    /// after the cache evicts it
    Resolved(AssetData),
    /// The load failed
    Rejected(String),
}

/// Shared view of one requested asset's load state.
///
/// The state only changes on the thread that owns the asset manager, when
/// completions are bound into the cache.
#[derive(Debug, Clone)]
pub struct LoadHandle {
    path: Arc<str>,
    state: Arc<Mutex<LoadState>>,
}

impl LoadHandle {
    pub(crate) fn new(path: &str, state: LoadState) -> Self {
        Self {
            path: Arc::from(path),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Requested path, also the cache key
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current state
    pub fn state(&self) -> LoadState {
        self.lock().clone()
    }

    /// Whether the load is still pending
    pub fn is_pending(&self) -> bool {
        matches!(*self.lock(), LoadState::Pending)
    }

    /// Whether the load finished successfully
    pub fn is_resolved(&self) -> bool {
        matches!(*self.lock(), LoadState::Resolved(_))
    }

    /// Loaded value, once resolved
    pub fn data(&self) -> Option<AssetData> {
        match &*self.lock() {
            LoadState::Resolved(data) => Some(data.clone()),
            _ => None,
        }
    }

    /// Loaded value as a `T`, once resolved
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.data()?.downcast::<T>()
    }

    pub(crate) fn set(&self, state: LoadState) {
        *self.lock() = state;
    }

    fn lock(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
