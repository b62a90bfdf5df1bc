use std::fmt;

/// Outcome of a redemption request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    AlreadyRedeemed,
    Expired,
    Invalid,
    RateLimited,
    NetworkError,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Success,
        Status::AlreadyRedeemed,
        Status::Expired,
        Status::Invalid,
        Status::RateLimited,
        Status::NetworkError,
    ];

    /// Whether the code now counts as redeemed on the account
    pub fn is_redeemed(self) -> bool {
        matches!(self, Status::Success | Status::AlreadyRedeemed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::Success => "Redeemed successfully",
            Status::AlreadyRedeemed => "Already redeemed",
            Status::Expired => "Code expired",
            Status::Invalid => "Invalid code",
            Status::RateLimited => "Too many requests, try again later",
            Status::NetworkError => "Network error",
        };
        f.write_str(text)
    }
}

/// Result of a sign-in attempt
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginOutcome {
    pub signed_in: bool,
    pub user: String,
}

impl LoginOutcome {
    pub fn signed_in(user: impl Into<String>) -> Self {
        Self {
            signed_in: true,
            user: user.into(),
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }
}

/// Network session that signs in and redeems codes.
///
/// Both calls block; they are only ever invoked from worker jobs.
#[cfg_attr(test, mockall::automock)]
pub trait RedemptionClient: Send + Sync {
    fn login(&self) -> LoginOutcome;

    fn redeem(&self, code: &str) -> Status;
}

/// Client used when no redemption service is configured.
///
/// Sign-in always fails, so redemption is never reached through the gate.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineClient;

impl RedemptionClient for OfflineClient {
    fn login(&self) -> LoginOutcome {
        tracing::warn!("No redemption service configured, sign-in unavailable");
        LoginOutcome::failed()
    }

    fn redeem(&self, code: &str) -> Status {
        tracing::warn!("No redemption service configured, cannot redeem {}", code);
        Status::NetworkError
    }
}
