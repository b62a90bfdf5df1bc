// State module
//
// Explicit state machines owned by the controlling thread:
// - AuthGate: sign-in progress, gates redemption
// - SelectionPhase: where the selection controller is for the current key
// and the ControllerEvent values emitted whenever either changes.

use crate::models::{AuthState, SelectionKey};
use crate::services::client::{LoginOutcome, Status};
use std::time::Duration;

/// Change events emitted by the selection controller
///
/// Every controller operation returns the events it produced and publishes
/// them on a broadcast channel, so a UI can react without polling.
#[derive(Clone, Debug, PartialEq)]
pub enum ControllerEvent {
    /// A new (game, platform) pair was selected
    SelectionChanged { key: SelectionKey },

    /// The display table was rebuilt for `key`
    TableRendered { key: SelectionKey, rows: usize },

    /// A parse job was started for `key`
    ParseStarted { key: SelectionKey },

    /// A parse job for `key` was already running, nothing was submitted
    ParseRejected { key: SelectionKey },

    /// A parse job finished
    ParseFinished {
        key: SelectionKey,
        success: bool,
        added: usize,
        stale: bool,
    },

    /// Persisting a collection failed
    CommitFailed { key: SelectionKey, message: String },

    /// Sign-in state changed
    AuthChanged { state: AuthState },

    /// A redemption request dispatched from selection `key` completed
    Redeemed {
        key: SelectionKey,
        code: String,
        status: Status,
    },

    /// Transient status-bar text
    StatusMessage { text: String, timeout: Duration },
}

/// Sign-in state machine: `SignedOut -> SigningIn -> SignedIn(user) | SignedOut`.
///
/// Redemption is permitted only while signed in.
#[derive(Debug, Default)]
pub struct AuthGate {
    state: AuthState,
}

impl AuthGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Move to `SigningIn`.
    ///
    /// Returns `false` (and changes nothing) if a sign-in is already in
    /// progress or the session is already signed in.
    pub fn begin_login(&mut self) -> bool {
        match self.state {
            AuthState::SignedOut => {
                self.state = AuthState::SigningIn;
                true
            }
            AuthState::SigningIn => {
                tracing::debug!("Login ignored: sign-in already in progress");
                false
            }
            AuthState::SignedIn(_) => {
                tracing::debug!("Login ignored: already signed in");
                false
            }
        }
    }

    /// Apply the client's sign-in result.
    ///
    /// Ignored unless a sign-in is in progress. Returns `true` if the state changed.
    pub fn finish_login(&mut self, outcome: LoginOutcome) -> bool {
        if !self.state.is_pending() {
            tracing::warn!("Discarding login result, no sign-in in progress");
            return false;
        }

        self.state = if outcome.signed_in {
            AuthState::SignedIn(outcome.user)
        } else {
            AuthState::SignedOut
        };
        true
    }

    /// Whether a redemption may be dispatched right now
    pub fn can_redeem(&self) -> bool {
        self.state.is_signed_in()
    }

    /// Return to `SignedOut`.
    ///
    /// Refused while a sign-in is in flight. Returns `true` if the session
    /// was ended.
    pub fn sign_out(&mut self) -> bool {
        if self.state.is_pending() {
            tracing::warn!("Sign-out refused, sign-in in progress");
            return false;
        }

        self.state = AuthState::SignedOut;
        true
    }
}

/// Where the selection controller is for the current key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Idle(SelectionKey),
    Loading(SelectionKey),
    AwaitingParse(SelectionKey),
}

impl SelectionPhase {
    /// The currently selected key
    pub fn key(&self) -> SelectionKey {
        match *self {
            SelectionPhase::Idle(key)
            | SelectionPhase::Loading(key)
            | SelectionPhase::AwaitingParse(key) => key,
        }
    }

    pub fn is_awaiting_parse(&self) -> bool {
        matches!(self, SelectionPhase::AwaitingParse(_))
    }
}

impl Default for SelectionPhase {
    fn default() -> Self {
        SelectionPhase::Idle(SelectionKey::none())
    }
}
