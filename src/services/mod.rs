//! Services module - collaborators of the selection controller.
//!
//! Everything here is free of controller state and can be used on its own.
//!
//! # Components
//!
//! - [`CollectionStore`]: the staged view of one selection's codes, backed by a
//!   [`KeyStore`] ([`YamlKeyStore`] on disk, [`MemoryKeyStore`] in memory).
//!   Handles load, deduplicating stage, and idempotent commit.
//!
//! - [`CodeParser`]: capability that discovers codes into a staged collection.
//!   [`RegexCodeParser`] reads a text source; [`JobLog`] is the per-job logging
//!   context every parser receives.
//!
//! - [`ParserRegistry`]: which parser serves which (game, platform) pair.
//!
//! - [`RedemptionClient`]: sign-in and redemption against the remote service,
//!   reporting a [`Status`] per code.
//!
//! # Threading
//!
//! Parsers and clients block. The controller only ever calls them from worker
//! jobs (see [`crate::ui::bridge::WorkerBridge`]); the store is owned and used
//! by the controlling thread alone.

pub mod client;
pub mod parser;
pub mod registry;
pub mod store;

pub use client::{LoginOutcome, OfflineClient, RedemptionClient, Status};
pub use parser::{CodeParser, JobLog, RegexCodeParser, UNKNOWN_EXPIRATION};
pub use registry::ParserRegistry;
pub use store::{CollectionStore, KeyStore, MemoryKeyStore, StoreError, YamlKeyStore};
