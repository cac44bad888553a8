//! Asset manager
//!
//! Front door of the asset system. Requests are dispatched to a loader pool;
//! finished loads travel back over a channel and are bound into the LRU cache
//! by [`AssetManager::update`], which the frame loop calls on the owning
//! thread. Cache order therefore never changes concurrently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};

use super::cache::AssetCache;
use super::handle::{LoadHandle, LoadState};
use super::loader::{AssetData, AssetLoader, BinaryLoader, SearchPaths, TextLoader};
use super::pool::LoaderPool;
use super::AssetError;
use crate::core::config::AssetConfig;

struct Completion {
    key: String,
    result: Result<AssetData, AssetError>,
}

/// Asset management system
pub struct AssetManager {
    cache: AssetCache<AssetData>,
    loaders: Vec<Arc<dyn AssetLoader>>,
    fallback: Arc<dyn AssetLoader>,
    pool: Option<LoaderPool>,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    pending: HashMap<String, LoadHandle>,
    released: Vec<String>,
    alive: Arc<AtomicBool>,
}

impl AssetManager {
    /// Create a new asset manager with the built-in text and binary loaders
    pub fn new(config: &AssetConfig) -> Result<Self, AssetError> {
        let paths = SearchPaths::new(config.search_paths.iter());
        let pool = if config.loader_threads > 0 {
            Some(LoaderPool::new(config.loader_threads)?)
        } else {
            None
        };
        let (sender, receiver) = unbounded();
        let text: Arc<dyn AssetLoader> = Arc::new(TextLoader::new(paths.clone()));

        Ok(Self {
            cache: AssetCache::new(config.cache_capacity),
            loaders: vec![text],
            fallback: Arc::new(BinaryLoader::new(paths)),
            pool,
            sender,
            receiver,
            pending: HashMap::new(),
            released: Vec::new(),
            alive: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Register a loader. Loaders are consulted in registration order; the
    /// binary loader is the fallback when none supports a path.
    pub fn register_loader(&mut self, loader: impl AssetLoader + 'static) {
        debug!("Registered asset loader '{}'", loader.name());
        self.loaders.push(Arc::new(loader));
    }

    /// Start loading `path`.
    ///
    /// Cached paths resolve immediately and a path already in flight shares
    /// the existing handle. Otherwise the load runs on the pool (or inline
    /// when the pool has no threads) and its result is bound at the next
    /// [`AssetManager::update`].
    pub fn request(&mut self, path: &str) -> Result<LoadHandle, AssetError> {
        if self.is_shut_down() {
            return Err(AssetError::ShutDown);
        }
        if let Some(data) = self.cache.get(path) {
            return Ok(LoadHandle::new(path, LoadState::Resolved(data.clone())));
        }
        if let Some(handle) = self.pending.get(path) {
            return Ok(handle.clone());
        }

        let loader = self.loader_for(path);
        debug!("Loading '{}' with the {} loader", path, loader.name());
        let job = {
            let key = path.to_string();
            let sender = self.sender.clone();
            let alive = Arc::clone(&self.alive);
            move || {
                let result = loader.load(&key);
                // Drop results nobody will bind
                if alive.load(Ordering::Acquire) {
                    let _ = sender.send(Completion { key, result });
                }
            }
        };
        match &self.pool {
            Some(pool) => pool.execute(job)?,
            None => job(),
        }

        let handle = LoadHandle::new(path, LoadState::Pending);
        self.pending.insert(path.to_string(), handle.clone());
        Ok(handle)
    }

    /// Bind finished loads into the cache and settle their handles.
    /// Returns the number of completions applied.
    pub fn update(&mut self) -> usize {
        if self.is_shut_down() {
            return 0;
        }
        let completions: Vec<Completion> = self.receiver.try_iter().collect();
        let mut applied = 0;
        for completion in completions {
            if self.apply(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until `handle` settles or `timeout` elapses, binding
    /// completions as they arrive. Returns the handle's final state.
    pub fn wait(&mut self, handle: &LoadHandle, timeout: Duration) -> LoadState {
        let deadline = Instant::now() + timeout;
        self.update();
        while handle.is_pending() && !self.is_shut_down() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(completion) => {
                    self.apply(completion);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        handle.state()
    }

    /// Cached asset of type `T`; marks it most recently used
    pub fn get<T: std::any::Any + Send + Sync>(&mut self, key: &str) -> Option<Arc<T>> {
        self.cache.get(key)?.downcast::<T>()
    }

    /// Whether `key` is cached
    pub fn has(&self, key: &str) -> bool {
        self.cache.has(key)
    }

    /// Put a runtime-created asset in the cache. A load in flight for the
    /// same key resolves with this value and its own result is discarded.
    pub fn insert<T: std::any::Any + Send + Sync>(&mut self, key: &str, value: T) {
        let data = AssetData::new(value);
        if let Some(handle) = self.pending.remove(key) {
            debug!("'{}' inserted while loading; superseding the load", key);
            handle.set(LoadState::Resolved(data.clone()));
        }
        let evicted = self.cache.set(key, data);
        self.note_evicted(evicted);
    }

    /// Drop an asset from the cache
    pub fn remove(&mut self, key: &str) -> Option<AssetData> {
        let removed = self.cache.remove(key)?;
        self.released.push(key.to_string());
        Some(removed)
    }

    /// Keys that left the cache since the last call, oldest first. Owners of
    /// derived resources (GPU uploads) release theirs for these keys.
    pub fn take_released(&mut self) -> Vec<String> {
        std::mem::take(&mut self.released)
    }

    /// Read-only view of the cache
    pub fn cache(&self) -> &AssetCache<AssetData> {
        &self.cache
    }

    /// Number of loads in flight
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether [`AssetManager::shutdown`] has run
    pub fn is_shut_down(&self) -> bool {
        !self.alive.load(Ordering::Acquire)
    }

    /// Stop the loader pool and empty the cache.
    ///
    /// Loads already running are not interrupted, but their results are
    /// discarded. Pending handles are rejected.
    pub fn shutdown(&mut self) {
        if self.is_shut_down() {
            return;
        }
        self.alive.store(false, Ordering::Release);
        if let Some(mut pool) = self.pool.take() {
            pool.shutdown();
        }
        for (_, handle) in self.pending.drain() {
            handle.set(LoadState::Rejected(AssetError::ShutDown.to_string()));
        }
        self.released.extend(self.cache.keys().map(str::to_string));
        self.cache.clear();
        info!("Asset manager shut down");
    }

    fn loader_for(&self, path: &str) -> Arc<dyn AssetLoader> {
        self.loaders
            .iter()
            .find(|loader| loader.supports(path))
            .map_or_else(|| Arc::clone(&self.fallback), Arc::clone)
    }

    fn apply(&mut self, completion: Completion) -> bool {
        let Completion { key, result } = completion;
        let Some(handle) = self.pending.remove(&key) else {
            debug!("Dropping stale completion for '{}'", key);
            return false;
        };
        match result {
            Ok(data) => {
                debug!("Loaded '{}' ({})", key, data.type_name());
                let evicted = self.cache.set(key.as_str(), data.clone());
                self.note_evicted(evicted);
                handle.set(LoadState::Resolved(data));
            }
            Err(err) => {
                error!("Failed to load '{}': {}", key, err);
                handle.set(LoadState::Rejected(err.to_string()));
            }
        }
        true
    }

    fn note_evicted(&mut self, evicted: Vec<(String, AssetData)>) {
        for (key, _) in evicted {
            if self.cache.max_size() == 0 {
                warn!("Asset cache has zero capacity; '{}' was not cached", key);
            } else {
                debug!("Evicted '{}' from the asset cache", key);
            }
            self.released.push(key);
        }
    }
}

impl Drop for AssetManager {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
    }
}
