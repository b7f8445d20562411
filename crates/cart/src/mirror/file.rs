//! File-backed mirror.
//!
//! Each key maps to `<dir>/<sanitized-key>.json`. Saves go to a sibling
//! `.tmp` file which is then renamed over the target, so a reader sees
//! either the old value or the new one, never a torn write.

use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, instrument};

use super::{MirrorError, PersistentMirror};

/// Mirror storing one JSON file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileMirror {
    dir: PathBuf,
}

impl FileMirror {
    /// Create a mirror rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File path backing `key`.
    ///
    /// Characters outside `[A-Za-z0-9._-]` become `_`, so versioned keys
    /// like `stockcart:cart:v1` map to `stockcart_cart_v1.json`.
    ///
    /// # Errors
    ///
    /// Returns `MirrorError::InvalidKey` for keys that are empty or consist
    /// only of dots.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, MirrorError> {
        if key.is_empty() || key.chars().all(|c| c == '.') {
            return Err(MirrorError::InvalidKey(key.to_string()));
        }

        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        Ok(self.dir.join(format!("{name}.json")))
    }
}

impl PersistentMirror for FileMirror {
    #[instrument(skip(self))]
    async fn load(&self, key: &str) -> Result<Option<String>, MirrorError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No stored value");
                Ok(None)
            }
            Err(e) => Err(MirrorError::Io(e)),
        }
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn save(&self, key: &str, value: &str) -> Result<(), MirrorError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&tmp, value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(MirrorError::Io(e));
        }

        debug!(path = %path.display(), "Saved value");
        Ok(())
    }
}
