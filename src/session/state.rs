//! Session State Types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::types::UserIdentity;

/// Authentication lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Anonymous,
    /// A persisted credential is being checked
    Authenticating,
    Authenticated,
    /// The server rejected the credential; passed through on forced logout
    Expired,
}

impl SessionState {
    /// States in which a credential is held and requests carry it
    pub fn holds_credential(&self) -> bool {
        matches!(self, SessionState::Authenticating | SessionState::Authenticated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated => "authenticated",
            SessionState::Expired => "expired",
        })
    }
}

/// Observable view of the session; never carries the credential
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub identity: Option<UserIdentity>,
    pub epoch: u64,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }
}

/// Notifications for the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { user_id: u64, epoch: u64 },
    Restored { user_id: u64, epoch: u64 },
    LoggedOut { epoch: u64 },
    /// Navigate to the login surface: the server rejected the credential
    LoginRequired { epoch: u64 },
}

/// Result of restoring a persisted session at startup
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    Restored(UserIdentity),
    Anonymous,
}

impl RestoreOutcome {
    pub fn identity(&self) -> Option<&UserIdentity> {
        match self {
            RestoreOutcome::Restored(identity) => Some(identity),
            RestoreOutcome::Anonymous => None,
        }
    }
}

/// Input for account registration
#[derive(Clone, PartialEq, Eq)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Repeated password, when the caller collects one
    pub password_confirmation: Option<String>,
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}
