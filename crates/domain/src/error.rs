//! Domain error types.

use thiserror::Error;

use crate::order::{OrderNumber, ProductId};

/// Coarse classification of domain failures.
///
/// Callers branch on the kind rather than on individual variants: it decides
/// the status code at the HTTP edge and whether a failure is a client error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input. Never retried.
    Validation,
    /// Unknown order or unknown product within an order.
    NotFound,
    /// A business rule rejected the operation in the current state.
    InvalidState,
}

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Client name is required")]
    ClientNameRequired,

    #[error("Description is required")]
    DescriptionRequired,

    #[error("Description is {length} characters long (maximum is {max})")]
    DescriptionTooLong { length: usize, max: usize },

    #[error("Invalid quantity: {quantity} (must be between 1 and 2147483647)")]
    InvalidQuantity { quantity: i64 },

    #[error("Invalid unit price: {cents} cents (must be greater than 0)")]
    InvalidUnitPrice { cents: i64 },

    /// A price, subtotal or order total would not fit in an `i64` of cents.
    #[error("Amount out of range: {what} would exceed {max} cents", max = i64::MAX)]
    AmountOverflow { what: &'static str },

    #[error("Invalid order number: {value:?}")]
    InvalidOrderNumber { value: String },

    #[error("Invalid product id: {value:?}")]
    InvalidProductId { value: String },

    #[error("Invalid order status: {value:?}")]
    InvalidStatus { value: String },

    #[error("Order not found: {order_number}")]
    OrderNotFound { order_number: OrderNumber },

    #[error("Item {product_id} not found in order {order_number}")]
    ItemNotFound {
        order_number: OrderNumber,
        product_id: ProductId,
    },

    /// Closed orders are immutable.
    #[error("Order {order_number} is closed and cannot {action}")]
    OrderClosed {
        order_number: OrderNumber,
        action: &'static str,
    },

    #[error("Order {order_number} is already closed")]
    AlreadyClosed { order_number: OrderNumber },

    #[error("Order {order_number} has no items and cannot be closed")]
    NoItems { order_number: OrderNumber },

    #[error(
        "Quantity of {product_id} cannot drop below zero (current {current}, change {delta})"
    )]
    NegativeQuantity {
        product_id: ProductId,
        current: u32,
        delta: i64,
    },
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::ClientNameRequired
            | OrderError::DescriptionRequired
            | OrderError::DescriptionTooLong { .. }
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidUnitPrice { .. }
            | OrderError::AmountOverflow { .. }
            | OrderError::InvalidOrderNumber { .. }
            | OrderError::InvalidProductId { .. }
            | OrderError::InvalidStatus { .. } => ErrorKind::Validation,
            OrderError::OrderNotFound { .. } | OrderError::ItemNotFound { .. } => {
                ErrorKind::NotFound
            }
            OrderError::OrderClosed { .. }
            | OrderError::AlreadyClosed { .. }
            | OrderError::NoItems { .. }
            | OrderError::NegativeQuantity { .. } => ErrorKind::InvalidState,
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, OrderError>;
