use crate::models::{DEFAULT_MAX_WORKERS, Game, Platform, SelectionKey};
use serde::{Deserialize, Serialize};

/// User settings from `Settings.yaml`, optionally overridden by
/// `SHIFTKEYS_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Last selected game
    pub game: Game,

    /// Last selected platform
    pub platform: Platform,

    /// Never forward log output to the status surface
    pub no_gui: bool,

    pub debug_mode: bool,

    /// Upper bound on concurrently running worker jobs
    pub max_workers: usize,

    /// How long transient status messages stay visible
    pub status_timeout_secs: u64,

    /// Directory (relative to the config dir) holding persisted collections
    pub keys_dir: String,

    /// Text sources to register file-backed parsers for
    pub sources: Vec<SourceConfig>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            game: Game::None,
            platform: Platform::None,
            no_gui: false,
            debug_mode: false,
            max_workers: DEFAULT_MAX_WORKERS,
            status_timeout_secs: 10,
            keys_dir: "keys".to_string(),
            sources: Vec::new(),
        }
    }
}

impl UserConfig {
    /// The selection stored in the settings
    pub fn selection(&self) -> SelectionKey {
        SelectionKey::new(self.game, self.platform)
    }

    /// Remember `key` as the last selection
    pub fn set_selection(&mut self, key: SelectionKey) {
        self.game = key.game;
        self.platform = key.platform;
    }
}

/// One parser registration: codes for `game`/`platform` are discovered in `path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub game: Game,
    pub platform: Platform,
    pub path: String,
}

impl SourceConfig {
    pub fn key(&self) -> SelectionKey {
        SelectionKey::new(self.game, self.platform)
    }
}
