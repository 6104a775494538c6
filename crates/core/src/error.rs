//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{ProductId, ShopId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Why a stock check failed: what was asked for and what was left at check time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortage {
    pub product: ProductId,
    pub shop: ShopId,
    pub requested: i64,
    pub available: i64,
}

impl core::fmt::Display for StockShortage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "product {} at shop {}: requested {}, available {}",
            self.product, self.shop, self.requested, self.available
        )
    }
}

/// Domain-level error.
///
/// Stock shortages are expected outcomes and carry enough detail for the caller
/// to retry with a smaller amount or another shop. `StockInconsistency` is the
/// exception: it signals corrupted stock data and must never be retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested resource does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Requested amount exceeds the remaining stock of one availability row.
    #[error("insufficient stock: {0}")]
    InsufficientStock(StockShortage),

    /// One or more lines of an order could not be reserved; nothing was kept.
    #[error("order placement failed: {reason} ({} item(s) short)", .failed_items.len())]
    OrderPlacementFailed {
        reason: String,
        failed_items: Vec<StockShortage>,
    },

    /// The order state machine does not allow the requested move.
    #[error("invalid order transition: {current} -> {requested}")]
    InvalidOrderTransition {
        current: &'static str,
        requested: &'static str,
    },

    /// Stock bookkeeping no longer adds up (data-integrity failure).
    #[error("stock inconsistency: {0}")]
    StockInconsistency(String),

    /// A conflict occurred (duplicate row, stale version).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The actor lacks the named permission.
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn inconsistency(msg: impl Into<String>) -> Self {
        Self::StockInconsistency(msg.into())
    }

    pub fn forbidden(permission: impl Into<String>) -> Self {
        Self::Forbidden(permission.into())
    }

    /// Whether the same call may succeed later without any input change.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::InsufficientStock(_)
                | DomainError::OrderPlacementFailed { .. }
                | DomainError::Conflict(_)
        )
    }
}
