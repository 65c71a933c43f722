//! Durable Credential Slot
//!
//! One process-wide slot holding the bearer credential and the last known
//! identity. Only the session manager writes it.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::api::types::UserIdentity;
use crate::config::mask_secret;
use crate::error::{ClientError, Result};

/// What survives a restart
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub token: String,
    #[serde(default)]
    pub user: Option<UserIdentity>,
    pub saved_at: DateTime<Utc>,
}

impl PersistedSession {
    pub fn new(token: impl Into<String>, user: Option<UserIdentity>) -> Self {
        Self {
            token: token.into(),
            user,
            saved_at: Utc::now(),
        }
    }
}

impl fmt::Debug for PersistedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedSession")
            .field("token", &mask_secret(&self.token))
            .field("user", &self.user.as_ref().map(|u| &u.username))
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

/// Durable key-value slot for the session credential
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<PersistedSession>>;
    fn save(&self, session: &PersistedSession) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Keeps the slot in memory (tests, ephemeral sessions)
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<PersistedSession>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        *self.slot.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.slot.lock().take();
        Ok(())
    }
}

/// JSON file slot, replaced atomically on every save
pub struct FileCredentialStore {
    path: PathBuf,
    // Serialises writers within this process
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<PersistedSession>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<PersistedSession>(&data) {
            Ok(session) if !session.token.is_empty() => Ok(Some(session)),
            Ok(_) => Ok(None),
            Err(e) => {
                // A corrupt slot is treated as no session rather than a hard failure
                warn!(path = %self.path.display(), "Discarding unreadable session file: {}", e);
                Ok(None)
            }
        }
    }

    fn save(&self, session: &PersistedSession) -> Result<()> {
        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec_pretty(session)?;
        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path).map_err(|e| {
            ClientError::Storage(format!(
                "failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(path = %self.path.display(), "Session persisted");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Session file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
