//! Stockcart Core - Shared cart types.
//!
//! This crate provides the value types used across all stockcart components:
//! - `stockcart` - Cart store, stock oracle and persistence adapters
//! - `stockcart-cli` - Command-line front-end
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! Cart edits are pure functions from one [`Cart`] value to the next; the
//! store crate decides which candidate is accepted.
//!
//! # Modules
//!
//! - [`types`] - Product ids, catalog data, stock snapshots and carts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
