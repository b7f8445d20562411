//! Stockcart - a shopping cart kept consistent with remote stock.
//!
//! The [`store::CartStore`] owns the cart and validates every change against
//! a [`oracle::StockOracle`] before writing it to a
//! [`mirror::PersistentMirror`]. Failures are reported through a
//! [`notify::NotificationSink`].
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`error`] - Cart operation errors and user-facing messages
//! - [`mirror`] - Persistent key-value backends
//! - [`notify`] - Failure notification sinks
//! - [`oracle`] - Stock and catalog lookups
//! - [`store`] - The cart store

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod mirror;
pub mod notify;
pub mod oracle;
pub mod store;

pub use config::CartConfig;
pub use error::{CartError, Operation};
pub use mirror::{FileMirror, MemoryMirror, MirrorError, PersistentMirror};
pub use notify::{FailureKind, NotificationSink, TracingSink};
pub use oracle::{HttpStockOracle, OracleError, StockOracle};
pub use store::{CartStore, StoreOptions};
