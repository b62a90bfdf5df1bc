use crate::models::UserConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Prefix of environment variables that override `Settings.yaml`
pub const ENV_PREFIX: &str = "SHIFTKEYS";

/// Configuration manager for loading and saving the settings file.
///
/// Owns the data directory layout:
/// - `Settings.yaml`: user settings (last selection, worker pool, parser sources)
/// - `keys/` (configurable): one persisted collection per selection key
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    user_config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing configuration files (e.g., "ShiftKeys Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            user_config_path: config_dir.join("Settings.yaml"),
            config_dir,
        })
    }

    /// Load the user configuration.
    ///
    /// Layers, lowest priority first: built-in defaults, `Settings.yaml`
    /// (optional), then `SHIFTKEYS_*` environment variables such as
    /// `SHIFTKEYS_MAX_WORKERS=2`.
    pub fn load_user_config(&self) -> Result<UserConfig> {
        self.load_layered(None)
    }

    /// Same as [`load_user_config`](Self::load_user_config), reading overrides
    /// from `vars` instead of the process environment.
    pub fn load_user_config_with_env(
        &self,
        vars: config::Map<String, String>,
    ) -> Result<UserConfig> {
        self.load_layered(Some(vars))
    }

    fn load_layered(&self, vars: Option<config::Map<String, String>>) -> Result<UserConfig> {
        if !self.user_config_path.exists() {
            tracing::warn!(
                "User config file not found at {}, using defaults",
                self.user_config_path
            );
        }

        let settings = config::Config::builder()
            .add_source(
                config::File::from(self.user_config_path.as_std_path())
                    .format(config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .with_context(|| format!("Failed to read user config: {}", self.user_config_path))?;

        let config: UserConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse user config: {}", self.user_config_path))?;

        tracing::info!(
            "Loaded user config from {} (selection {}, {} sources)",
            self.user_config_path,
            config.selection(),
            config.sources.len()
        );
        Ok(config)
    }

    /// Save the user configuration file.
    ///
    /// # Arguments
    /// * `config` - The UserConfig to save
    pub fn save_user_config(&self, config: &UserConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize user config to YAML")?;

        fs::write(&self.user_config_path, yaml_string)
            .with_context(|| format!("Failed to write user config: {}", self.user_config_path))?;

        tracing::info!("Saved user config to {}", self.user_config_path);
        Ok(())
    }

    /// Directory holding the persisted collections for `config`
    pub fn keys_dir(&self, config: &UserConfig) -> Utf8PathBuf {
        self.config_dir.join(&config.keys_dir)
    }

    /// Resolve a parser source path; relative paths are taken from the config directory
    pub fn source_path(&self, path: &str) -> Utf8PathBuf {
        let path = Utf8Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn user_config_path(&self) -> &Utf8Path {
        &self.user_config_path
    }
}
