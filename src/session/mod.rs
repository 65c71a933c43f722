//! Session Management
//!
//! Owns the bearer credential and the authenticated identity for the whole
//! client. State machine:
//!
//! ```text
//!   Anonymous ──login/register──► Authenticated
//!      │                             │     ▲
//!      │ restore_session             │     │ restore ok
//!      ▼                             │     │
//!   Authenticating ──────────────────┼─────┘
//!      │ 401                         │ 401 on any request
//!      ▼                             ▼
//!   Expired ──(credential cleared)──► Anonymous
//! ```
//!
//! `logout` returns to Anonymous from any state. Every transition bumps or
//! preserves the session epoch, and responses issued under an older epoch
//! are discarded.

mod manager;
mod state;
mod store;

pub use manager::SessionManager;
pub use state::{
    RegistrationForm, RestoreOutcome, SessionEvent, SessionSnapshot, SessionState,
};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, PersistedSession};
