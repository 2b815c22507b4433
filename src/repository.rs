//! Canonical reading collection
//!
//! [`ReadingRepository`] holds at most one reading per calendar date and
//! merges new batches last-write-wins: the newest import for a date
//! replaces whatever was there, regardless of source.
//!
//! [`HydratedRepository`] wraps a repository with an explicit
//! `Uninitialized -> Loading -> Ready` lifecycle over a [`KeyValueStore`],
//! so reads and writes can never observe a half-loaded collection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::models::Reading;
use crate::store::KeyValueStore;

/// Store key holding the serialized collection
pub const DEFAULT_COLLECTION_KEY: &str = "hrv_readings";

/// In-memory collection keyed by date
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingRepository {
    readings: BTreeMap<NaiveDate, Reading>,
}

impl ReadingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from stored readings, later entries winning on date clashes
    pub fn from_readings(readings: Vec<Reading>) -> Self {
        let mut repository = Self::new();
        repository.import_readings(readings);
        repository
    }

    /// Upsert a batch by date.
    ///
    /// Returns how many dates were added that did not exist before this
    /// call. Replacements, and repeats of a date within the batch, are
    /// not counted; the last candidate for a date is the one kept.
    pub fn import_readings<I>(&mut self, batch: I) -> usize
    where
        I: IntoIterator<Item = Reading>,
    {
        let mut added = 0;
        let mut replaced = 0;

        for reading in batch {
            let date = reading.date;
            match self.readings.insert(date, reading) {
                None => added += 1,
                Some(previous) => {
                    debug!(%date, previous_source = %previous.source, "Replacing reading");
                    replaced += 1;
                }
            }
        }

        info!(added, replaced, total = self.readings.len(), "Merged readings");
        added
    }

    /// Exact-date lookup
    pub fn get_reading_by_date(&self, date: NaiveDate) -> Option<&Reading> {
        self.readings.get(&date)
    }

    /// All readings, ascending by date
    pub fn readings(&self) -> Vec<Reading> {
        self.readings.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.values()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }
}

/// Lifecycle of a store-backed repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryState {
    Uninitialized,
    Loading,
    Ready,
}

impl fmt::Display for RepositoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryState::Uninitialized => write!(f, "uninitialized"),
            RepositoryState::Loading => write!(f, "loading"),
            RepositoryState::Ready => write!(f, "ready"),
        }
    }
}

/// Repository loaded from, and committed to, a key-value store.
///
/// Assumes a single writer: concurrent writers sharing the same store
/// key overwrite each other's commits.
pub struct HydratedRepository<S: KeyValueStore> {
    store: S,
    key: String,
    state: RepositoryState,
    repository: ReadingRepository,
}

impl<S: KeyValueStore> HydratedRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_COLLECTION_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            state: RepositoryState::Uninitialized,
            repository: ReadingRepository::new(),
        }
    }

    pub fn state(&self) -> RepositoryState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == RepositoryState::Ready
    }

    /// Load the collection from the store.
    ///
    /// A missing key hydrates to an empty collection. On failure the
    /// repository returns to `Uninitialized` and may be hydrated again.
    pub fn hydrate(&mut self) -> Result<()> {
        if self.state == RepositoryState::Ready {
            return Ok(());
        }

        self.state = RepositoryState::Loading;

        match self.load() {
            Ok(repository) => {
                info!(key = %self.key, readings = repository.len(), "Repository hydrated");
                self.repository = repository;
                self.state = RepositoryState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Hydration failed");
                self.state = RepositoryState::Uninitialized;
                Err(e)
            }
        }
    }

    fn load(&self) -> Result<ReadingRepository> {
        let Some(blob) = self.store.get(&self.key)? else {
            return Ok(ReadingRepository::new());
        };

        let readings: Vec<Reading> =
            serde_json::from_str(&blob).map_err(|e| StoreError::Corrupt {
                key: self.key.clone(),
                reason: e.to_string(),
            })?;

        Ok(ReadingRepository::from_readings(readings))
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state != RepositoryState::Ready {
            return Err(StoreError::NotReady {
                state: self.state.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let blob = serde_json::to_string(&self.repository.readings())?;
        self.store.set(&self.key, blob)
    }

    /// Merge a batch and commit the whole collection
    pub fn import_readings(&mut self, batch: Vec<Reading>) -> Result<usize> {
        self.ensure_ready()?;

        let added = self.repository.import_readings(batch);
        self.commit()?;
        Ok(added)
    }

    pub fn get_reading_by_date(&self, date: NaiveDate) -> Result<Option<&Reading>> {
        self.ensure_ready()?;
        Ok(self.repository.get_reading_by_date(date))
    }

    /// Read access to the hydrated collection
    pub fn repository(&self) -> Result<&ReadingRepository> {
        self.ensure_ready()?;
        Ok(&self.repository)
    }

    /// Remove every reading and commit the empty collection
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_ready()?;

        self.repository.clear();
        self.commit()
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
