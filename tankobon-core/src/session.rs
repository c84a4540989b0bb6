//! Locally persisted session state.
//!
//! The session (logged-in user plus bearer token) is an explicit context
//! object with load/save/clear operations at defined lifecycle points,
//! rather than ambient global state. Consumers load it once at startup,
//! pass it to whatever needs it, and save it after a successful login or
//! token refresh.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{acquire_file_lock, serialize_atomically, traceable_path, SerializeError};

/// An account on the catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session file")]
    Read(#[source] std::io::Error),
    #[error("failed to create session directory")]
    CreateDir(#[source] std::io::Error),
    #[error("failed to delete session file")]
    Delete(#[source] std::io::Error),
    #[error("failed to write session file")]
    Write(#[from] SerializeError),
}

/// The persisted session: who is logged in, and with what token.
///
/// Both fields are optional; an empty context is the logged-out state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub token: Option<String>,
}

impl SessionContext {
    pub fn authenticated(user: User, token: impl Into<String>) -> Self {
        SessionContext {
            user: Some(user),
            token: Some(token.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    /// Load the session from `path`.
    ///
    /// A missing file is the logged-out state. A file that fails to parse
    /// is discarded the same way, so a corrupt session never wedges the
    /// client; the user just has to log in again.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let contents = match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionContext::default());
            },
            Err(err) => return Err(SessionError::Read(err)),
        };

        match serde_json::from_str(&contents) {
            Ok(session) => Ok(session),
            Err(err) => {
                debug!(
                    path = traceable_path(path.as_ref()),
                    %err,
                    "discarding corrupt session file"
                );
                Ok(SessionContext::default())
            },
        }
    }

    /// Write the session to `path` atomically, creating parent directories
    /// as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(SessionError::CreateDir)?;
        }
        let lock = acquire_file_lock(path.as_ref())?;
        serialize_atomically(self, &path.as_ref(), lock)?;
        debug!(path = traceable_path(path.as_ref()), "saved session");
        Ok(())
    }

    /// Remove the session file, logging the user out. Removing an already
    /// absent file is not an error.
    pub fn clear(path: impl AsRef<Path>) -> Result<(), SessionError> {
        match std::fs::remove_file(path.as_ref()) {
            Ok(()) => {
                debug!(path = traceable_path(path.as_ref()), "cleared session");
                Ok(())
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SessionError::Delete(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn a_user() -> User {
        User {
            id: "u-1".to_string(),
            name: "reader".to_string(),
            email: Some("reader@example.com".to_string()),
            roles: vec!["ROLE_USER".to_string()],
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("session.json");

        let session = SessionContext::authenticated(a_user(), "tok-123");
        session.save(&path).unwrap();

        let loaded = SessionContext::load(&path).unwrap();
        assert_eq!(loaded, session);
        assert!(loaded.is_authenticated());
    }

    #[test]
    fn missing_file_is_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = SessionContext::load(dir.path().join("session.json")).unwrap();
        assert_eq!(loaded, SessionContext::default());
        assert!(!loaded.is_authenticated());
    }

    #[test]
    fn corrupt_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = SessionContext::load(&path).unwrap();
        assert_eq!(loaded, SessionContext::default());
    }

    #[test]
    fn clear_removes_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        SessionContext::authenticated(a_user(), "tok")
            .save(&path)
            .unwrap();
        assert!(path.exists());

        SessionContext::clear(&path).unwrap();
        assert!(!path.exists());

        // second clear is a no-op
        SessionContext::clear(&path).unwrap();
    }
}
