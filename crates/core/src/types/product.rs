//! Catalog and stock data as served by the product API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Catalog data for a single product.
///
/// Fields other than `id` are optional on the wire so that a sparse catalog
/// entry still decodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog identifier.
    pub id: ProductId,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Unit price in the store currency.
    #[serde(default)]
    pub price: Decimal,
    /// Product image URL.
    #[serde(default)]
    pub image: String,
}

impl Product {
    /// Create a product with the given catalog fields.
    #[must_use]
    pub fn new(id: ProductId, title: impl Into<String>, price: Decimal, image: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            price,
            image: image.into(),
        }
    }
}

/// Available stock for a product at the moment it was fetched.
///
/// Never cached: every cart operation fetches a fresh snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    /// Product the snapshot belongs to.
    pub id: ProductId,
    /// Units available.
    pub amount: u32,
}

impl StockSnapshot {
    /// Create a snapshot.
    #[must_use]
    pub const fn new(id: ProductId, amount: u32) -> Self {
        Self { id, amount }
    }

    /// Whether `requested` units fit within the available stock.
    #[must_use]
    pub const fn allows(&self, requested: u32) -> bool {
        requested <= self.amount
    }
}
