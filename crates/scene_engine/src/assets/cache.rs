//! LRU asset cache
//!
//! Entries are kept in recency order (least recently used first) in an
//! `IndexMap`, so eviction always takes index 0 and a hit moves the entry to
//! the back.

use indexmap::IndexMap;

/// Bounded key/value cache with least-recently-used eviction
#[derive(Debug, Clone)]
pub struct AssetCache<V> {
    entries: IndexMap<String, V>,
    max_size: usize,
}

impl<V> AssetCache<V> {
    /// Create a cache holding at most `max_size` entries
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            max_size,
        }
    }

    /// Store a value, returning the entries evicted to make room.
    ///
    /// Storing under an existing key replaces the value and refreshes its
    /// recency without evicting anything else. With a maximum size of 0
    /// nothing is stored and the new entry itself is returned.
    pub fn set(&mut self, key: impl Into<String>, value: V) -> Vec<(String, V)> {
        let key = key.into();
        if let Some(index) = self.entries.get_index_of(&key) {
            self.entries[index] = value;
            self.touch(index);
            return Vec::new();
        }
        if self.max_size == 0 {
            return vec![(key, value)];
        }

        let mut evicted = Vec::new();
        while self.entries.len() >= self.max_size {
            match self.entries.shift_remove_index(0) {
                Some(entry) => evicted.push(entry),
                None => break,
            }
        }
        self.entries.insert(key, value);
        evicted
    }

    /// Look up a value and mark it most recently used
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let index = self.entries.get_index_of(key)?;
        let index = self.touch(index);
        self.entries.get_index(index).map(|(_, value)| value)
    }

    /// Mutable lookup; marks the entry most recently used
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let index = self.entries.get_index_of(key)?;
        let index = self.touch(index);
        self.entries.get_index_mut(index).map(|(_, value)| value)
    }

    /// Look up a value without touching its recency
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    /// Whether the key is cached. Does not affect recency.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove an entry
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.shift_remove(key)
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries from least to most recently used
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Maximum number of entries
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the bound, evicting least recently used entries down to it
    pub fn set_max_size(&mut self, max_size: usize) -> Vec<(String, V)> {
        self.max_size = max_size;
        let excess = self.entries.len().saturating_sub(max_size);
        self.entries.drain(..excess).collect()
    }

    fn touch(&mut self, index: usize) -> usize {
        let last = self.entries.len() - 1;
        self.entries.move_index(index, last);
        last
    }
}
