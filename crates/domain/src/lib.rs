//! Domain layer for the order service.
//!
//! This crate provides:
//! - The `Order` aggregate root and its owned `OrderItem` entities
//! - Self-validating value objects (`Money`, `OrderNumber`, `ProductId`)
//! - The `OrderEvent` tagged union raised by aggregate mutations
//! - `OrderError` and its coarse `ErrorKind` classification

pub mod aggregate;
pub mod error;
pub mod order;

pub use aggregate::{AggregateRoot, DomainEvent};
pub use common::{AggregateId, Version};
pub use error::{ErrorKind, OrderError, Result};
pub use order::{
    ItemAddedData, ItemQuantityChangedData, ItemRemovedData, Money, Order, OrderClosedData,
    OrderCreatedData, OrderDeletedData, OrderEvent, OrderItem, OrderItemId, OrderNumber,
    OrderRecord, OrderStatus, ProductId,
};
