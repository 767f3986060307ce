use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Order, OrderItem, OrderItemId, OrderNumber};

use crate::{AggregateId, OrderQuery, OrderSummary, OutboxId, OutboxMessage, Page, Result, Version};

/// Transactional access to order rows.
#[async_trait]
pub trait OrderStore: Send {
    /// Loads a live (not soft-deleted) order with its items.
    ///
    /// Backends that support it lock the order row until the transaction
    /// ends, so concurrent writers to the same order queue up behind it.
    async fn find_by_number(&mut self, number: &OrderNumber) -> Result<Option<Order>>;

    /// Inserts the order header at [`Version::first`].
    ///
    /// Items are written separately through [`OrderItemStore`].
    async fn insert_order(&mut self, order: &Order) -> Result<Version>;

    /// Writes the order header if the stored version still equals
    /// `order.version()`, and returns the new version.
    ///
    /// Fails with `ConcurrencyConflict` otherwise.
    async fn update_order(&mut self, order: &Order) -> Result<Version>;
}

/// Transactional access to the items owned by an order.
#[async_trait]
pub trait OrderItemStore: Send {
    async fn insert_item(&mut self, order_id: AggregateId, item: &OrderItem) -> Result<()>;

    async fn update_item_quantity(&mut self, item: &OrderItem) -> Result<()>;

    async fn delete_item(&mut self, item_id: OrderItemId) -> Result<()>;
}

/// Transactional writes to the outbox table.
#[async_trait]
pub trait OutboxStore: Send {
    async fn insert_message(&mut self, message: &OutboxMessage) -> Result<()>;

    /// Inserts several messages, preserving their order.
    async fn insert_messages(&mut self, messages: &[OutboxMessage]) -> Result<()> {
        for message in messages {
            self.insert_message(message).await?;
        }
        Ok(())
    }
}

/// One storage transaction.
///
/// Nothing written through it is visible to others until [`commit`]
/// succeeds. Dropping a transaction without committing rolls it back.
///
/// [`commit`]: Transaction::commit
#[async_trait]
pub trait Transaction: OrderStore + OrderItemStore + OutboxStore + Sized {
    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// A storage backend that can open transactions.
#[async_trait]
pub trait Database: Clone + Send + Sync + 'static {
    type Tx: Transaction + 'static;

    async fn begin(&self) -> Result<Self::Tx>;
}

/// Non-transactional reads.
#[async_trait]
pub trait OrderQueries: Send + Sync {
    /// Loads a live order with its items, without locking.
    async fn get_by_number(&self, number: &OrderNumber) -> Result<Option<Order>>;

    /// Lists live orders newest first, filtered and paged by the backend.
    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<OrderSummary>>;
}

/// The contract an external relay uses to drain the outbox.
#[async_trait]
pub trait OutboxRelay: Send + Sync {
    /// Unprocessed messages in write order, at most `limit` of them.
    async fn fetch_unprocessed(&self, limit: usize) -> Result<Vec<OutboxMessage>>;

    /// Flags messages as processed. Returns how many were changed;
    /// already-processed ids are left alone.
    async fn mark_processed(&self, ids: &[OutboxId], at: DateTime<Utc>) -> Result<u64>;
}
