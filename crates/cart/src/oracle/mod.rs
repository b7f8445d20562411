//! Stock and catalog lookups.
//!
//! # Architecture
//!
//! - The product API is the source of truth for stock; nothing is synced
//!   locally and stock snapshots are never cached
//! - Catalog data changes rarely and is cached in memory via `moka`
//!   (5 minute TTL) by the HTTP adapter
//!
//! # Example
//!
//! ```rust,ignore
//! use stockcart::oracle::{HttpStockOracle, StockOracle};
//!
//! let oracle = HttpStockOracle::new(&config.stock_api)?;
//! let stock = oracle.get_stock(ProductId::new(1)).await?;
//! ```

mod http;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use stockcart_core::{Product, ProductId, StockSnapshot};
use thiserror::Error;

pub use http::HttpStockOracle;

/// Errors that can occur when looking up stock or catalog data.
#[derive(Debug, Error)]
pub enum OracleError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Product does not exist in the catalog.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the product API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Non-success status other than 404/429.
    #[error("Unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// Lookup did not answer in time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Oracle is unreachable for another reason.
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

/// Source of truth for available stock and catalog data.
pub trait StockOracle: Send + Sync {
    /// Fetch the current stock for a product.
    fn get_stock(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<StockSnapshot, OracleError>> + Send;

    /// Fetch catalog data for a product.
    fn get_product(&self, id: ProductId)
    -> impl Future<Output = Result<Product, OracleError>> + Send;
}

impl<T: StockOracle> StockOracle for Arc<T> {
    fn get_stock(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<StockSnapshot, OracleError>> + Send {
        (**self).get_stock(id)
    }

    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Product, OracleError>> + Send {
        (**self).get_product(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_error_display() {
        let err = OracleError::NotFound("product 12".to_string());
        assert_eq!(err.to_string(), "Not found: product 12");

        let err = OracleError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Unexpected status 502: bad gateway");

        let err = OracleError::Timeout(Duration::from_secs(3));
        assert_eq!(err.to_string(), "Timed out after 3s");
    }
}
