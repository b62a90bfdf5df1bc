use std::fmt;

/// Sign-in state of the redemption client session.
///
/// `SigningIn` and `SignedIn` are mutually exclusive by construction, and the
/// user name only exists while signed in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    SignedOut,
    SigningIn,
    SignedIn(String),
}

impl AuthState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, AuthState::SignedIn(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AuthState::SigningIn)
    }

    /// The signed-in user, if any
    pub fn user(&self) -> Option<&str> {
        match self {
            AuthState::SignedIn(user) => Some(user),
            _ => None,
        }
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::SignedOut => f.write_str("login"),
            AuthState::SigningIn => f.write_str("signing in"),
            AuthState::SignedIn(_) => f.write_str("signed in"),
        }
    }
}
