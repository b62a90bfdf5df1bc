// ShiftKeys - SHiFT code collection and redemption
//
// This is the library crate containing the selection controller, its
// collaborators and data structures. The binary crate (main.rs) provides a
// headless entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{AuthState, CodeEntry, Collection, Game, Platform, SelectionKey, UserConfig};
pub use state::{AuthGate, ControllerEvent, SelectionPhase};
pub use ui::{ControllerOptions, SelectionController};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
