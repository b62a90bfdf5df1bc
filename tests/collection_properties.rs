//! Property tests for collections, staging and rendering
//!
//! - render(C) yields exactly size(C) rows in reverse discovery order
//! - staging never produces two entries with the same code
//! - staging a known code never changes the existing entry

use proptest::prelude::*;
use shiftkeys::models::{CodeEntry, Collection, Game, Platform, SelectionKey};
use shiftkeys::services::{CollectionStore, MemoryKeyStore};
use shiftkeys::ui::TableReconciler;
use std::collections::HashSet;
use std::sync::Arc;

fn codes_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-E]{1,2}", 0..40)
}

fn entries(codes: &[String], description: &str) -> Vec<CodeEntry> {
    codes
        .iter()
        .map(|code| CodeEntry::new(code.clone(), description, "Unknown"))
        .collect()
}

proptest! {
    #[test]
    fn test_render_is_reverse_discovery_order(codes in codes_strategy()) {
        let collection = Collection::from_entries(entries(&codes, "seed"));
        let mut table = TableReconciler::new();

        let rendered: Vec<String> = table
            .render(&collection)
            .iter()
            .map(|row| row.code.clone())
            .collect();

        prop_assert_eq!(rendered.len(), collection.len());

        let mut expected: Vec<String> = Vec::new();
        for code in &codes {
            if !expected.contains(code) {
                expected.push(code.clone());
            }
        }
        expected.reverse();
        prop_assert_eq!(rendered, expected);
    }

    #[test]
    fn test_render_twice_never_accumulates(first in codes_strategy(), second in codes_strategy()) {
        let mut table = TableReconciler::new();
        table.render(&Collection::from_entries(entries(&first, "a")));
        let second = Collection::from_entries(entries(&second, "b"));

        prop_assert_eq!(table.render(&second).len(), second.len());
    }

    #[test]
    fn test_stage_never_duplicates(seed in codes_strategy(), found in codes_strategy()) {
        let key = SelectionKey::new(Game::Borderlands3, Platform::Pc);
        let backend = Arc::new(MemoryKeyStore::new().with_entries(key, entries(&seed, "seed")));
        let mut store = CollectionStore::new(backend);
        store.load(key).unwrap();
        let before = store.size();

        let added = store.stage(entries(&found, "found"));

        let codes: Vec<&str> = store.entries().map(CodeEntry::code).collect();
        let unique: HashSet<&str> = codes.iter().copied().collect();
        prop_assert_eq!(unique.len(), codes.len());
        prop_assert_eq!(store.size(), before + added);

        for code in seed.iter() {
            prop_assert_eq!(store.collection().get(code).unwrap().description(), "seed");
        }
    }
}
