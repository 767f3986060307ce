//! Application error types.

use domain::{ErrorKind, OrderError};
use store::StoreError;
use thiserror::Error;

/// Errors returned by the order use cases.
///
/// Cache failures never appear here; they are recovered on the read path.
#[derive(Debug, Error)]
pub enum AppError {
    /// A business rule or input check rejected the request.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The storage transaction failed and was rolled back.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// The domain classification, if this is a domain failure.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Order(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// True when the write lost a race with another writer.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AppError::Storage(StoreError::ConcurrencyConflict { .. })
        )
    }
}

/// Convenience type alias for application results.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use common::{AggregateId, Version};

    use super::*;

    #[test]
    fn test_kind_comes_from_domain_error() {
        let err = AppError::from(OrderError::ClientNameRequired);
        assert_eq!(err.kind(), Some(ErrorKind::Validation));
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_concurrency_conflict_is_detected() {
        let err = AppError::from(StoreError::ConcurrencyConflict {
            order_id: AggregateId::new(),
            expected: Version::first(),
        });
        assert!(err.is_conflict());
        assert_eq!(err.kind(), None);
    }
}
