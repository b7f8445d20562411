//! Cart operation errors.
//!
//! Every failed operation produces a [`CartError`]. The store reports it to
//! the notification sink with a user-facing message and also returns it, so
//! callers may branch on the cause. Infrastructure failures (oracle,
//! persistence) are additionally captured to Sentry when it is configured.

use stockcart_core::ProductId;
use thiserror::Error;

use crate::mirror::MirrorError;
use crate::notify::FailureKind;
use crate::oracle::OracleError;

/// Shown when a requested quantity exceeds available stock.
pub const STOCK_EXCEEDED_MESSAGE: &str = "Requested quantity is out of stock";

/// Cart operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Remove,
    Update,
    Clear,
}

impl Operation {
    /// Generic user-facing message for a failure of this operation.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Add => "Could not add product to cart",
            Self::Remove => "Could not remove product from cart",
            Self::Update => "Could not update product quantity",
            Self::Clear => "Could not clear cart",
        }
    }
}

/// Reasons a cart operation is rejected or fails.
#[derive(Debug, Error)]
pub enum CartError {
    /// Requested quantity exceeds available stock.
    #[error("Requested {requested} of product {product_id}, only {available} in stock")]
    StockExceeded {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Product is not in the cart.
    #[error("Product {0} is not in the cart")]
    NotFound(ProductId),

    /// Requested quantity is below 1.
    #[error("Invalid amount {0}: must be at least 1")]
    InvalidAmount(u32),

    /// Stock or catalog lookup failed.
    #[error("Stock lookup failed: {0}")]
    Oracle(#[from] OracleError),

    /// Writing the cart to storage failed.
    #[error("Cart persistence failed: {0}")]
    Persistence(#[from] MirrorError),
}

impl CartError {
    /// Failure category reported to the notification sink.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::StockExceeded { .. } => FailureKind::StockExceeded,
            Self::NotFound(_) => FailureKind::NotFound,
            Self::InvalidAmount(_) => FailureKind::InvalidAmount,
            Self::Oracle(_) => FailureKind::OracleFailure,
            Self::Persistence(_) => FailureKind::PersistenceFailure,
        }
    }

    /// Message shown to the user for this failure during `operation`.
    ///
    /// Stock shortages get a dedicated message; everything else uses the
    /// operation's generic failure text so internal details never leak.
    #[must_use]
    pub const fn user_message(&self, operation: Operation) -> &'static str {
        match self {
            Self::StockExceeded { .. } => STOCK_EXCEEDED_MESSAGE,
            _ => operation.failure_message(),
        }
    }

    /// Whether this failure came from infrastructure rather than the request.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Oracle(_) | Self::Persistence(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_display() {
        let err = CartError::StockExceeded {
            product_id: ProductId::new(1),
            requested: 2,
            available: 1,
        };
        assert_eq!(err.to_string(), "Requested 2 of product 1, only 1 in stock");

        let err = CartError::NotFound(ProductId::new(5));
        assert_eq!(err.to_string(), "Product 5 is not in the cart");
    }

    #[test]
    fn test_user_messages() {
        let stock = CartError::StockExceeded {
            product_id: ProductId::new(1),
            requested: 2,
            available: 1,
        };
        assert_eq!(stock.user_message(Operation::Add), STOCK_EXCEEDED_MESSAGE);
        assert_eq!(stock.user_message(Operation::Update), STOCK_EXCEEDED_MESSAGE);

        let oracle = CartError::Oracle(OracleError::Unavailable("down".to_string()));
        assert_eq!(oracle.user_message(Operation::Add), "Could not add product to cart");
        assert!(!oracle.user_message(Operation::Add).contains("down"));

        let invalid = CartError::InvalidAmount(0);
        assert_eq!(invalid.user_message(Operation::Update), "Could not update product quantity");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(CartError::InvalidAmount(0).kind(), FailureKind::InvalidAmount);
        assert_eq!(
            CartError::Persistence(MirrorError::Unavailable("disk".to_string())).kind(),
            FailureKind::PersistenceFailure
        );
        assert!(CartError::Oracle(OracleError::Timeout(std::time::Duration::from_secs(1))).is_infrastructure());
        assert!(!CartError::NotFound(ProductId::new(1)).is_infrastructure());
    }
}
