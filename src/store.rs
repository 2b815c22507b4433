//! Storage collaborators
//!
//! The statistics core never touches storage. These types back the
//! repository lifecycle wrapper and the surrounding application:
//!
//! - [`KeyValueStore`]: whole-blob `get`/`set` used to load and save the
//!   reading collection.
//! - [`ExpiringStore`]: keyed values with a per-key expiry, where an
//!   expired entry reads as absent and is dropped on access.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, StoreError};

/// Persistent key-value object store
pub trait KeyValueStore {
    /// Fetch the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: String) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Process-local store, mainly for tests and ephemeral sessions
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default data directory (`<local data dir>/hrvtrack`)
    pub fn default_root() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hrvtrack")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');

        if !valid {
            return Err(StoreError::Backend {
                reason: format!("invalid store key: {:?}", key),
            }
            .into());
        }

        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;

        // Write-then-rename so a crash never leaves a truncated collection
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;

        debug!(key, path = %path.display(), "Stored value");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Keyed values with an expiry timestamp per key.
///
/// Time is passed in explicitly so callers and tests control the clock.
pub trait ExpiringStore<V> {
    /// Live value for `key`; an expired entry is removed and reads as `None`
    fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<&V>;

    /// Insert or replace `key` with an absolute expiry
    fn insert(&mut self, key: &str, value: V, expires_at: DateTime<Utc>);

    fn remove(&mut self, key: &str) -> Option<V>;

    /// Drop every expired entry, returning how many were removed
    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize;
}

#[derive(Debug, Clone)]
struct ExpiringEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

impl<V> ExpiringEntry<V> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-memory [`ExpiringStore`]
#[derive(Debug, Clone)]
pub struct MemoryExpiringStore<V> {
    entries: HashMap<String, ExpiringEntry<V>>,
}

impl<V> MemoryExpiringStore<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Number of entries, including ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for MemoryExpiringStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ExpiringStore<V> for MemoryExpiringStore<V> {
    fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<&V> {
        let expired = self
            .entries
            .get(key)
            .map(|entry| entry.is_expired(now))
            .unwrap_or(false);

        if expired {
            self.entries.remove(key);
            return None;
        }

        self.entries.get(key).map(|entry| &entry.value)
    }

    fn insert(&mut self, key: &str, value: V, expires_at: DateTime<Utc>) {
        self.entries
            .insert(key.to_string(), ExpiringEntry { value, expires_at });
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "Purged expired entries");
        }
        removed
    }
}

/// Result of recording a hit against a [`FixedWindowCounter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowStatus {
    /// Hits in the current window, including this one
    pub count: u32,

    pub limit: u32,

    /// When the current window ends and the count restarts
    pub resets_at: DateTime<Utc>,
}

impl WindowStatus {
    pub fn allowed(&self) -> bool {
        self.count <= self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }
}

/// Per-key state kept by [`FixedWindowCounter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub count: u32,
    pub resets_at: DateTime<Utc>,
}

/// Fixed-window hit counter over any [`ExpiringStore`]
pub struct FixedWindowCounter<S: ExpiringStore<WindowState>> {
    store: S,
    window: Duration,
    limit: u32,
}

impl FixedWindowCounter<MemoryExpiringStore<WindowState>> {
    pub fn in_memory(window: Duration, limit: u32) -> Self {
        Self::new(MemoryExpiringStore::new(), window, limit)
    }
}

impl<S: ExpiringStore<WindowState>> FixedWindowCounter<S> {
    pub fn new(store: S, window: Duration, limit: u32) -> Self {
        Self {
            store,
            window,
            limit,
        }
    }

    /// Record one hit for `key`; a new window starts once the old one expires
    pub fn hit(&mut self, key: &str, now: DateTime<Utc>) -> WindowStatus {
        let state = match self.store.get(key, now) {
            Some(state) => WindowState {
                count: state.count.saturating_add(1),
                resets_at: state.resets_at,
            },
            None => WindowState {
                count: 1,
                resets_at: now + self.window,
            },
        };

        self.store.insert(key, state, state.resets_at);

        WindowStatus {
            count: state.count,
            limit: self.limit,
            resets_at: state.resets_at,
        }
    }
}
