//! Asset loaders
//!
//! A loader turns a path into an [`AssetData`] value. Loaders run on the
//! loader pool's worker threads, so they must be `Send + Sync` and must not
//! touch engine state.

use std::any::Any;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::AssetError;

/// Loaded asset value, shared between the cache and its readers
#[derive(Clone)]
pub struct AssetData {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl AssetData {
    /// Wrap a loaded value
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Shared pointer to the value if it is a `T`
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Borrow the value if it is a `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Whether the value is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Name of the stored type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for AssetData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetData").field("type", &self.type_name).finish()
    }
}

/// Loads assets of the formats it supports
pub trait AssetLoader: Send + Sync {
    /// Name used in log output
    fn name(&self) -> &str;

    /// Whether this loader handles `path`
    fn supports(&self, path: &str) -> bool;

    /// Load the asset at `path`
    fn load(&self, path: &str) -> Result<AssetData, AssetError>;
}

/// Ordered list of directories a relative asset path is resolved against
#[derive(Debug, Clone, Default)]
pub struct SearchPaths {
    roots: Vec<PathBuf>,
}

impl SearchPaths {
    /// Create from directory list
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// First existing candidate: each search root joined with `path`, then
    /// `path` itself.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, AssetError> {
        self.roots
            .iter()
            .map(|root| root.join(path))
            .chain(std::iter::once(PathBuf::from(path)))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }
}

fn has_extension(path: &str, extensions: &[&str]) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|candidate| ext.eq_ignore_ascii_case(candidate)))
}

/// Loads `.txt` / `.text` files as `String`
#[derive(Debug, Clone)]
pub struct TextLoader {
    paths: SearchPaths,
}

impl TextLoader {
    /// Create a loader resolving against `paths`
    pub fn new(paths: SearchPaths) -> Self {
        Self { paths }
    }
}

impl AssetLoader for TextLoader {
    fn name(&self) -> &str {
        "text"
    }

    fn supports(&self, path: &str) -> bool {
        has_extension(path, &["txt", "text"])
    }

    fn load(&self, path: &str) -> Result<AssetData, AssetError> {
        let resolved = self.paths.resolve(path)?;
        let text = fs::read_to_string(&resolved).map_err(|err| AssetError::LoaderFailed {
            path: path.to_string(),
            reason: err.to_string(),
        })?;
        Ok(AssetData::new(text))
    }
}

/// Loads any file as raw bytes (`Vec<u8>`)
#[derive(Debug, Clone)]
pub struct BinaryLoader {
    paths: SearchPaths,
}

impl BinaryLoader {
    /// Create a loader resolving against `paths`
    pub fn new(paths: SearchPaths) -> Self {
        Self { paths }
    }
}

impl AssetLoader for BinaryLoader {
    fn name(&self) -> &str {
        "binary"
    }

    fn supports(&self, _path: &str) -> bool {
        true
    }

    fn load(&self, path: &str) -> Result<AssetData, AssetError> {
        let resolved = self.paths.resolve(path)?;
        Ok(AssetData::new(fs::read(resolved)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_loader_supports_text_extensions() {
        let loader = TextLoader::new(SearchPaths::default());
        assert!(loader.supports("notes.txt"));
        assert!(loader.supports("dir/readme.TEXT"));
        assert!(!loader.supports("mesh.bin"));
        assert!(!loader.supports("txt"));
    }

    #[test]
    fn test_search_paths_resolve_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("a.txt"), "second").unwrap();
        std::fs::write(first.path().join("b.txt"), "first").unwrap();
        std::fs::write(second.path().join("b.txt"), "second").unwrap();

        let loader = TextLoader::new(SearchPaths::new([first.path(), second.path()]));
        let a = loader.load("a.txt").unwrap();
        let b = loader.load("b.txt").unwrap();

        assert_eq!(a.downcast_ref::<String>().map(String::as_str), Some("second"));
        assert_eq!(b.downcast_ref::<String>().map(String::as_str), Some("first"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = BinaryLoader::new(SearchPaths::new([dir.path()]));
        assert!(matches!(loader.load("absent.bin"), Err(AssetError::NotFound(path)) if path == "absent.bin"));
    }

    #[test]
    fn test_binary_loader_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blob.bin"), [1u8, 2, 3]).unwrap();

        let data = BinaryLoader::new(SearchPaths::new([dir.path()])).load("blob.bin").unwrap();
        assert!(data.is::<Vec<u8>>());
        assert_eq!(data.downcast::<Vec<u8>>().as_deref(), Some(&vec![1, 2, 3]));
        assert!(data.downcast::<String>().is_none());
    }
}
