//! Core types for the cart.
//!
//! This module provides type-safe wrappers for catalog, stock and cart data.

pub mod cart;
pub mod id;
pub mod product;

pub use cart::{Cart, LineItem};
pub use id::{ParseIdError, ProductId};
pub use product::{Product, StockSnapshot};
