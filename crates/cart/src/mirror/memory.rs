//! In-process mirror. Values live as long as the mirror does.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{MirrorError, PersistentMirror};

/// Mirror backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryMirror {
    /// Create an empty mirror.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mirror already holding `value` under `key`.
    #[must_use]
    pub fn seeded(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            values: RwLock::new(HashMap::from([(key.into(), value.into())])),
        }
    }

    /// Current value under `key`.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.values.read().await.get(key).cloned()
    }
}

impl PersistentMirror for MemoryMirror {
    async fn load(&self, key: &str) -> Result<Option<String>, MirrorError> {
        Ok(self.get(key).await)
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), MirrorError> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
