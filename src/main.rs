//! ShiftKeys - SHiFT code collection and redemption
//!
//! Headless entry point.
//!
//! # Execution Flow
//!
//! 1. Load `ShiftKeys Data/Settings.yaml` (plus `SHIFTKEYS_*` overrides)
//! 2. Initialize logging → logs/shiftkeys.<date>
//! 3. Create tokio runtime for the worker pool
//! 4. Register a file-backed parser for every configured source
//! 5. Select the key given on the command line (`bl3/pc`) or the last one saved
//! 6. Wait for the parse job, print the table
//! 7. Save the selection and shut the runtime down with a 5s timeout
//!
//! # Configuration Files
//!
//! Expected in `ShiftKeys Data/`:
//! - `Settings.yaml`: last selection, worker pool size, parser sources
//! - `keys/<game>-<platform>.yaml`: persisted codes, written by the application

use anyhow::Result;
use shiftkeys::logging::{LogSink, setup_logging_with_console};
use shiftkeys::services::{CollectionStore, OfflineClient, ParserRegistry, RegexCodeParser, YamlKeyStore};
use shiftkeys::{
    APP_NAME, ConfigManager, ControllerOptions, SelectionController, SelectionKey, VERSION,
};
use std::sync::Arc;
use std::time::Duration;

/// Directory holding settings and persisted collections
const DATA_DIR: &str = "ShiftKeys Data";

fn main() -> Result<()> {
    let config_manager = ConfigManager::new(DATA_DIR)?;
    let mut user_config = config_manager.load_user_config()?;

    let sink = if user_config.no_gui {
        LogSink::disabled()
    } else {
        LogSink::new()
    };

    // Held until main returns so buffered log lines are flushed
    let _guard = setup_logging_with_console(
        "logs",
        "shiftkeys",
        user_config.debug_mode,
        true,
        Some(sink.clone()),
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("shiftkeys-worker")
        .build()?;

    let mut registry = ParserRegistry::new();
    for source in &user_config.sources {
        let path = config_manager.source_path(&source.path);
        registry.register(
            source.game,
            source.platform,
            Arc::new(RegexCodeParser::new(path)),
        );
    }
    tracing::info!("Registered {} parsers", registry.len());

    let backend = YamlKeyStore::new(config_manager.keys_dir(&user_config))?;
    let options = ControllerOptions {
        max_workers: user_config.max_workers,
        status_timeout: Duration::from_secs(user_config.status_timeout_secs),
    };

    let mut controller = SelectionController::new(
        CollectionStore::new(Arc::new(backend)),
        registry,
        Arc::new(OfflineClient),
        sink,
        runtime.handle().clone(),
        options,
    );

    let key = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<SelectionKey>()?,
        None => user_config.selection(),
    };

    controller.select(key);
    runtime.block_on(async {
        while let Some(events) = controller.process_next().await {
            tracing::debug!("Applied {} controller events", events.len());
        }
    });

    println!("{} ({} codes)", key, controller.rows().len());
    for row in controller.rows() {
        println!("{}", row);
    }

    controller.metrics().log_summary();
    drop(controller);

    user_config.set_selection(key);
    if let Err(e) = config_manager.save_user_config(&user_config) {
        tracing::error!("Failed to save settings: {:#}", e);
    }

    runtime.shutdown_timeout(Duration::from_secs(5));

    tracing::info!("Application shutdown complete");
    Ok(())
}
