use super::models::Session;
use crate::core::error::{FirebaseError, FirebaseResult};
use std::io;
use std::path::{Path, PathBuf};

/// Stores the session as a JSON file so a restart keeps the user signed in.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `Ok(None)` when no session was saved.
    pub fn load(&self) -> FirebaseResult<Option<Session>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(FirebaseError::internal(format!(
                    "Failed to read session from {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, session: &Session) -> FirebaseResult<()> {
        let content = serde_json::to_vec(session)?;
        std::fs::write(&self.path, content).map_err(|e| {
            FirebaseError::internal(format!(
                "Failed to write session to {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Removes the saved session. A missing file counts as cleared.
    pub fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
