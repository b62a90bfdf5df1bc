use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single redemption code with its metadata.
///
/// Everything except the `redeemed` flag is fixed at construction; the flag is
/// flipped by the owning [`Collection`] when a redemption succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry {
    code: String,
    description: String,
    expiration: String,
    #[serde(default)]
    redeemed: bool,
}

impl CodeEntry {
    pub fn new(
        code: impl Into<String>,
        description: impl Into<String>,
        expiration: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            expiration: expiration.into(),
            redeemed: false,
        }
    }

    /// Builder-style variant used when loading already-redeemed codes
    pub fn with_redeemed(mut self, redeemed: bool) -> Self {
        self.redeemed = redeemed;
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn expiration(&self) -> &str {
        &self.expiration
    }

    pub fn redeemed(&self) -> bool {
        self.redeemed
    }
}

/// Ordered, deduplicated set of [`CodeEntry`] values keyed by `code`.
///
/// Insertion order is discovery order. [`entries()`](Self::entries) yields the
/// display order, most recently discovered first. Inserting a code that is
/// already present is a no-op (first write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    entries: IndexMap<String, CodeEntry>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from stored entries, dropping later duplicates
    pub fn from_entries(entries: impl IntoIterator<Item = CodeEntry>) -> Self {
        let mut collection = Self::new();
        collection.extend_new(entries);
        collection
    }

    /// Insert an entry unless its code is already known.
    ///
    /// Returns `true` when the entry was added.
    pub fn insert(&mut self, entry: CodeEntry) -> bool {
        if self.entries.contains_key(entry.code()) {
            return false;
        }
        self.entries.insert(entry.code.clone(), entry);
        true
    }

    /// Insert every entry whose code is new, returning how many were added
    pub fn extend_new(&mut self, entries: impl IntoIterator<Item = CodeEntry>) -> usize {
        entries
            .into_iter()
            .map(|entry| self.insert(entry))
            .filter(|added| *added)
            .count()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    pub fn get(&self, code: &str) -> Option<&CodeEntry> {
        self.entries.get(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in display order (reverse discovery order).
    ///
    /// Borrowing iterator; call again to restart.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &CodeEntry> + ExactSizeIterator {
        self.entries.values().rev()
    }

    /// Entries in discovery order, the order they are persisted in
    pub fn discovery_order(&self) -> impl DoubleEndedIterator<Item = &CodeEntry> + ExactSizeIterator {
        self.entries.values()
    }

    /// Flip the `redeemed` flag for `code`.
    ///
    /// Returns `true` only if the flag actually changed.
    pub fn mark_redeemed(&mut self, code: &str) -> bool {
        match self.entries.get_mut(code) {
            Some(entry) if !entry.redeemed => {
                entry.redeemed = true;
                true
            }
            _ => false,
        }
    }

    /// Entries whose code is not in `base`, in discovery order
    pub fn difference(&self, base: &Collection) -> Vec<CodeEntry> {
        self.entries
            .values()
            .filter(|entry| !base.contains(entry.code()))
            .cloned()
            .collect()
    }

    /// Clone the entries out in discovery order
    pub fn to_vec(&self) -> Vec<CodeEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
