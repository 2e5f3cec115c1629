//! No-op session store: disables persistence entirely.

use async_trait::async_trait;
use quill_core::collaborator::SessionStore;
use quill_core::error::PersistenceError;

/// A session store that remembers nothing. Every load starts empty.
pub struct NoopSessionStore;

#[async_trait]
impl SessionStore for NoopSessionStore {
    fn name(&self) -> &str {
        "none"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn remove(&self, _key: &str) -> Result<(), PersistenceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_is_empty() {
        let store = NoopSessionStore;
        store.set("k", "v").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        assert_eq!(store.name(), "none");
    }
}
