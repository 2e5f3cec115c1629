//! In-memory session store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use quill_core::collaborator::SessionStore;
use quill_core::error::PersistenceError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A session store that keeps values in a HashMap for the process lifetime.
///
/// Clones share the same map, so a test can hand one clone to a memory store
/// and inspect what was persisted through another.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.values.write().await.remove(key);
        Ok(())
    }
}
