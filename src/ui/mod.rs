// UI module - Controlling-thread side of the application
//
// This module contains:
// - WorkerBridge: Runs blocking jobs on a bounded pool and posts results to an inbox
// - ParseCoordinator: Single-flight parse jobs per selection key
// - TableReconciler: Projects the staged collection into display rows
// - SelectionController: State machine tying selection, parsing, sign-in and redemption together

pub mod bridge;
pub mod controller;
pub mod coordinator;
pub mod table;

pub use bridge::{ParseCompletion, WorkerBridge, WorkerMessage};
pub use controller::{ControllerOptions, DEFAULT_STATUS_TIMEOUT, SelectionController};
pub use coordinator::{ParseCoordinator, ParseJob};
pub use table::{DisplayRow, TableReconciler};
