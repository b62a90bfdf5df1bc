use crate::models::{Game, Platform, SelectionKey};
use crate::services::parser::CodeParser;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps each (game, platform) pair to the parser that serves it.
///
/// Populated once at startup. Games and platforms are remembered in
/// registration order for the selection drop-downs.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: HashMap<SelectionKey, Arc<dyn CodeParser>>,
    games: IndexSet<Game>,
    platforms: IndexSet<Platform>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `parser` for (`game`, `platform`).
    ///
    /// Registering a pair that already has a parser is a no-op, as is any pair
    /// containing `None`. Returns `true` if the parser was added.
    pub fn register(&mut self, game: Game, platform: Platform, parser: Arc<dyn CodeParser>) -> bool {
        let key = SelectionKey::new(game, platform);
        if key.has_none() {
            tracing::warn!("Refusing to register a parser for {}", key);
            return false;
        }
        if self.parsers.contains_key(&key) {
            tracing::debug!("Parser for {} already registered", key);
            return false;
        }

        self.games.insert(game);
        self.platforms.insert(platform);
        self.parsers.insert(key, parser);

        tracing::debug!("Registered parser for {} ({} / {})", key, game, platform);
        true
    }

    /// The parser serving `key`, if any. Keys containing `None` never have one.
    pub fn lookup(&self, key: SelectionKey) -> Option<Arc<dyn CodeParser>> {
        if key.has_none() {
            return None;
        }
        self.parsers.get(&key).cloned()
    }

    pub fn contains(&self, key: SelectionKey) -> bool {
        self.parsers.contains_key(&key)
    }

    /// Games with at least one parser, in registration order
    pub fn games(&self) -> impl Iterator<Item = Game> + '_ {
        self.games.iter().copied()
    }

    /// Platforms with at least one parser, in registration order
    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.platforms.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}
