use domain::OrderItemId;
use thiserror::Error;

use crate::{AggregateId, Version};

/// Errors that can occur when reading or writing orders.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order row was changed by someone else since it was loaded.
    #[error(
        "Concurrency conflict for order {order_id}: expected version {expected} is no longer current"
    )]
    ConcurrencyConflict {
        order_id: AggregateId,
        expected: Version,
    },

    /// A unique constraint (order number, product id, primary key) rejected the write.
    #[error("Duplicate key violates {constraint}")]
    DuplicateKey { constraint: String },

    /// The order targeted by a write does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(AggregateId),

    /// The item targeted by a write does not exist.
    #[error("Order item not found: {0}")]
    ItemNotFound(OrderItemId),

    /// A stored row could not be turned back into a domain value.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// The backend refused the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
