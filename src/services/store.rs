use crate::models::{CodeEntry, Collection, SelectionKey};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors raised by [`CollectionStore`] itself (backend failures go through anyhow)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Selection {0} has no persisted collection")]
    NoSelection(SelectionKey),

    #[error("No collection is loaded")]
    NothingLoaded,
}

/// Durable backing storage for code collections, one list per selection key
pub trait KeyStore: Send + Sync {
    /// All persisted entries for `key`, in discovery order
    fn load(&self, key: SelectionKey) -> Result<Vec<CodeEntry>>;

    /// Replace the persisted entries for `key`
    fn commit(&self, key: SelectionKey, entries: &[CodeEntry]) -> Result<()>;
}

/// One YAML document per selection key, e.g. `keys/bl3-pc.yaml`
#[derive(Debug, Clone)]
pub struct YamlKeyStore {
    dir: Utf8PathBuf,
}

impl YamlKeyStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn new<P: AsRef<Utf8Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create key store directory: {}", dir))?;
        }
        Ok(Self { dir })
    }

    /// File holding the entries for `key`
    pub fn path_for(&self, key: SelectionKey) -> Utf8PathBuf {
        self.dir.join(format!("{}.yaml", key.slug()))
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }
}

impl KeyStore for YamlKeyStore {
    fn load(&self, key: SelectionKey) -> Result<Vec<CodeEntry>> {
        let path = self.path_for(key);
        if !path.exists() {
            tracing::debug!("No persisted codes for {} at {}", key, path);
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read key file: {}", path))?;
        let entries: Vec<CodeEntry> = serde_yaml_ng::from_str(&contents)
            .with_context(|| format!("Failed to parse key file: {}", path))?;

        tracing::debug!("Loaded {} codes for {} from {}", entries.len(), key, path);
        Ok(entries)
    }

    fn commit(&self, key: SelectionKey, entries: &[CodeEntry]) -> Result<()> {
        let path = self.path_for(key);
        let yaml = serde_yaml_ng::to_string(entries)
            .with_context(|| format!("Failed to serialize codes for {}", key))?;

        fs::write(&path, yaml).with_context(|| format!("Failed to write key file: {}", path))?;

        tracing::debug!("Committed {} codes for {} to {}", entries.len(), key, path);
        Ok(())
    }
}

/// In-process [`KeyStore`], used by tests and as a scratch store
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    data: Mutex<HashMap<SelectionKey, Vec<CodeEntry>>>,
    commits: Mutex<usize>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed persisted entries for `key`
    pub fn with_entries(self, key: SelectionKey, entries: Vec<CodeEntry>) -> Self {
        self.data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, entries);
        self
    }

    /// Number of successful `commit` calls so far
    pub fn commit_count(&self) -> usize {
        *self.commits.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Persisted entries for `key` without going through the trait
    pub fn persisted(&self, key: SelectionKey) -> Vec<CodeEntry> {
        self.data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self, key: SelectionKey) -> Result<Vec<CodeEntry>> {
        Ok(self.persisted(key))
    }

    fn commit(&self, key: SelectionKey, entries: &[CodeEntry]) -> Result<()> {
        self.data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, entries.to_vec());
        *self.commits.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;
        Ok(())
    }
}

/// Staged, in-memory view of the collection for the active selection key.
///
/// The view is rebuilt from the backing [`KeyStore`] on every
/// [`load()`](Self::load); newly discovered entries are [`stage`](Self::stage)d
/// into it and written back with [`commit()`](Self::commit). Committing a view
/// with no staged changes does not touch the backing store.
pub struct CollectionStore {
    backend: Arc<dyn KeyStore>,
    active: Option<SelectionKey>,
    collection: Collection,
    dirty: bool,
}

impl CollectionStore {
    pub fn new(backend: Arc<dyn KeyStore>) -> Self {
        Self {
            backend,
            active: None,
            collection: Collection::new(),
            dirty: false,
        }
    }

    /// Replace the view with the persisted entries for `key`.
    ///
    /// Read-only with respect to the backing store. On failure the view is
    /// left empty but still scoped to `key`.
    pub fn load(&mut self, key: SelectionKey) -> Result<&Collection> {
        self.clear();
        if key.has_none() {
            return Err(StoreError::NoSelection(key).into());
        }

        self.active = Some(key);
        let entries = self.backend.load(key)?;
        self.collection = Collection::from_entries(entries);

        tracing::debug!("Staged view for {} holds {} codes", key, self.collection.len());
        Ok(&self.collection)
    }

    /// Drop the in-memory view without persisting anything
    pub fn clear(&mut self) {
        self.active = None;
        self.collection.clear();
        self.dirty = false;
    }

    /// Append entries whose code is not yet in the view.
    ///
    /// Returns the number of entries actually added.
    pub fn stage(&mut self, entries: impl IntoIterator<Item = CodeEntry>) -> usize {
        let added = self.collection.extend_new(entries);
        if added > 0 {
            self.dirty = true;
        }
        added
    }

    /// Persist the view for the active key.
    ///
    /// Returns `Ok(false)` without writing when nothing was staged since the
    /// last load or commit.
    pub fn commit(&mut self) -> Result<bool> {
        let key = self.active.ok_or(StoreError::NothingLoaded)?;
        if !self.dirty {
            return Ok(false);
        }

        self.backend.commit(key, &self.collection.to_vec())?;
        self.dirty = false;

        tracing::info!("Committed {} codes for {}", self.collection.len(), key);
        Ok(true)
    }

    /// Merge `delta` into the persisted collection of a key that is not the
    /// active one, leaving the view untouched.
    ///
    /// Returns the number of entries that were new to the persisted store.
    pub fn commit_detached(&self, key: SelectionKey, delta: Vec<CodeEntry>) -> Result<usize> {
        if key.has_none() {
            return Err(StoreError::NoSelection(key).into());
        }

        let mut persisted = Collection::from_entries(self.backend.load(key)?);
        let added = persisted.extend_new(delta);
        if added > 0 {
            self.backend.commit(key, &persisted.to_vec())?;
            tracing::info!("Committed {} new codes for inactive selection {}", added, key);
        }

        Ok(added)
    }

    /// Flag `code` as redeemed in the view; the change is staged for commit
    pub fn mark_redeemed(&mut self, code: &str) -> bool {
        let changed = self.collection.mark_redeemed(code);
        if changed {
            self.dirty = true;
        }
        changed
    }

    /// Flag `code` as redeemed in the persisted collection of `key`, leaving
    /// the view untouched.
    ///
    /// Returns `Ok(false)` without writing when `key` has no such code or it
    /// is already flagged.
    pub fn mark_redeemed_detached(&self, key: SelectionKey, code: &str) -> Result<bool> {
        if key.has_none() {
            return Err(StoreError::NoSelection(key).into());
        }

        let mut persisted = Collection::from_entries(self.backend.load(key)?);
        if !persisted.mark_redeemed(code) {
            return Ok(false);
        }

        self.backend.commit(key, &persisted.to_vec())?;
        tracing::info!("Marked {} redeemed for inactive selection {}", code, key);
        Ok(true)
    }

    pub fn active_key(&self) -> Option<SelectionKey> {
        self.active
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn size(&self) -> usize {
        self.collection.len()
    }

    /// Entries in display order (most recently discovered first)
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &CodeEntry> + ExactSizeIterator {
        self.collection.entries()
    }

    /// Whether the view holds changes that have not been committed
    pub fn has_staged_changes(&self) -> bool {
        self.dirty
    }
}
