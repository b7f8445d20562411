//! User-facing failure notifications.
//!
//! The store never presents errors itself. Every rejected or failed cart
//! operation is handed to a [`NotificationSink`], which decides how the user
//! hears about it (toast, status line, log).

use std::fmt;
use std::sync::Arc;

/// Failure category reported alongside the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Requested quantity exceeds available stock.
    StockExceeded,
    /// Target product is not in the cart.
    NotFound,
    /// Requested quantity is below 1.
    InvalidAmount,
    /// Stock or catalog lookup failed or timed out.
    OracleFailure,
    /// Writing the cart to persistent storage failed.
    PersistenceFailure,
}

impl FailureKind {
    /// Stable snake-case name, used as a structured log field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StockExceeded => "stock_exceeded",
            Self::NotFound => "not_found",
            Self::InvalidAmount => "invalid_amount",
            Self::OracleFailure => "oracle_failure",
            Self::PersistenceFailure => "persistence_failure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of user-facing failure reports.
///
/// Fire-and-forget: implementations must not block and the store ignores
/// whatever happens inside.
pub trait NotificationSink: Send + Sync {
    /// Report a failed cart operation.
    fn report_failure(&self, kind: FailureKind, message: &str);
}

impl<T: NotificationSink> NotificationSink for Arc<T> {
    fn report_failure(&self, kind: FailureKind, message: &str) {
        (**self).report_failure(kind, message);
    }
}

/// Sink that writes failures to the `tracing` subscriber at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn report_failure(&self, kind: FailureKind, message: &str) {
        tracing::warn!(kind = %kind, "{message}");
    }
}
