//! Durable key-value storage for the serialized cart.
//!
//! The store reads its initial cart from a [`PersistentMirror`] and writes
//! the full serialized cart back after every accepted mutation. Values are
//! opaque strings; the cart store owns the encoding.
//!
//! # Backends
//!
//! - [`FileMirror`] - one file per key in a data directory, replaced
//!   atomically on every save
//! - [`MemoryMirror`] - in-process map for ephemeral sessions

mod file;
mod memory;

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

pub use file::FileMirror;
pub use memory::MemoryMirror;

/// Errors from mirror operations.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Underlying I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cart could not be encoded for storage.
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Key cannot be mapped onto the backend.
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// Backend refused the operation.
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store holding the last accepted cart.
pub trait PersistentMirror: Send + Sync {
    /// Read the value stored under `key`, `None` if nothing was stored.
    fn load(&self, key: &str) -> impl Future<Output = Result<Option<String>, MirrorError>> + Send;

    /// Replace the value stored under `key`.
    fn save(&self, key: &str, value: &str) -> impl Future<Output = Result<(), MirrorError>> + Send;
}

impl<T: PersistentMirror> PersistentMirror for Arc<T> {
    fn load(&self, key: &str) -> impl Future<Output = Result<Option<String>, MirrorError>> + Send {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> impl Future<Output = Result<(), MirrorError>> + Send {
        (**self).save(key, value)
    }
}
