//! Data models for ShiftKeys.
//!
//! - [`SelectionKey`], [`Game`], [`Platform`]: what the user has selected
//! - [`CodeEntry`], [`Collection`]: discovered codes, ordered and deduplicated
//! - [`AuthState`]: sign-in state of the redemption session
//! - [`UserConfig`]: persisted settings
//!
//! [`DEFAULT_MAX_WORKERS`] bounds the worker pool shared by parse, login and
//! redeem jobs.

pub mod auth;
pub mod code;
pub mod config;
pub mod selection;

pub use auth::AuthState;
pub use code::{CodeEntry, Collection};
pub use config::{SourceConfig, UserConfig};
pub use selection::{Game, Platform, SelectionKey, SelectionParseError};

/// Default number of worker jobs allowed to run at once
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Capacity of the completion inbox drained by the controlling thread
pub const INBOX_CAPACITY: usize = 100;
