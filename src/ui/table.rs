use crate::models::{CodeEntry, Collection};
use serde::Serialize;
use std::fmt;

/// One row of the code table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub redeemed_mark: bool,
    pub description: String,
    pub code: String,
    pub expiration: String,
}

impl From<&CodeEntry> for DisplayRow {
    fn from(entry: &CodeEntry) -> Self {
        Self {
            redeemed_mark: entry.redeemed(),
            description: entry.description().to_string(),
            code: entry.code().to_string(),
            expiration: entry.expiration().to_string(),
        }
    }
}

impl fmt::Display for DisplayRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.redeemed_mark { "[x]" } else { "[ ]" };
        write!(
            f,
            "{} {:<29} {:<30} {}",
            mark, self.code, self.description, self.expiration
        )
    }
}

/// Project a collection into display rows, newest discovery first
pub fn project(collection: &Collection) -> Vec<DisplayRow> {
    collection.entries().map(DisplayRow::from).collect()
}

/// Holds the rows currently shown and replaces them wholesale on every render
#[derive(Debug, Default)]
pub struct TableReconciler {
    rows: Vec<DisplayRow>,
}

impl TableReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the table and insert one row per entry of `collection`
    pub fn render(&mut self, collection: &Collection) -> &[DisplayRow] {
        self.rows.clear();
        self.rows.extend(collection.entries().map(DisplayRow::from));
        &self.rows
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
