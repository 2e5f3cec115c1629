//! File-based session store: one JSON document per key.
//!
//! Each key maps to `<dir>/<sanitized-key>.json`. The CLI uses this so that a
//! session survives between invocations; the host application clears the
//! directory when the session ends.
//!
//! Storage location: `~/.quill/session/`

use async_trait::async_trait;
use quill_core::collaborator::SessionStore;
use quill_core::error::PersistenceError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A directory-backed key-value store.
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            // Not written yet: treat as absent
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::Read {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let write_err = |reason: String| PersistenceError::Write {
            key: key.to_string(),
            reason,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| write_err(format!("Failed to create session directory: {e}")))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| write_err(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| write_err(e.to_string()))?;

        debug!(path = %path.display(), bytes = value.len(), "Session value written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::Write {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
