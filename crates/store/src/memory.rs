use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    AggregateRoot, Money, Order, OrderItem, OrderItemId, OrderNumber, OrderRecord, OrderStatus,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    AggregateId, OrderQuery, OrderSummary, OutboxId, OutboxMessage, Page, Result, StoreError,
    Version,
    store::{
        Database, OrderItemStore, OrderQueries, OrderStore, OutboxRelay, OutboxStore, Transaction,
    },
};

const ORDER_NUMBER_CONSTRAINT: &str = "uq_orders_order_number";
const ORDER_PK_CONSTRAINT: &str = "orders_pkey";
const PRODUCT_ID_CONSTRAINT: &str = "uq_order_items_product_id";
const ITEM_PK_CONSTRAINT: &str = "order_items_pkey";

/// In-memory database for tests and single-process runs.
///
/// Provides the same interface as the PostgreSQL implementation.
/// Transactions are serialized: `begin` takes an exclusive lock and works on
/// a staged copy of the data, which replaces the live data on commit and is
/// discarded on rollback or drop.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    orders: HashMap<AggregateId, StoredOrder>,
    outbox: Vec<OutboxMessage>,
}

#[derive(Debug, Clone)]
struct StoredOrder {
    id: AggregateId,
    number: OrderNumber,
    client_name: String,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    total: Money,
    version: Version,
    items: Vec<OrderItem>,
}

impl StoredOrder {
    fn to_order(&self) -> Order {
        Order::restore(OrderRecord {
            id: self.id,
            number: self.number.clone(),
            client_name: self.client_name.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            closed_at: self.closed_at,
            deleted_at: self.deleted_at,
            items: self.items.clone(),
            version: self.version,
        })
    }

    fn summary(&self) -> OrderSummary {
        OrderSummary {
            id: self.id,
            order_number: self.number.clone(),
            client_name: self.client_name.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            closed_at: self.closed_at,
            total: self.total,
        }
    }

    fn copy_header(&mut self, order: &Order) {
        self.client_name = order.client_name().to_string();
        self.status = order.status();
        self.updated_at = order.updated_at();
        self.closed_at = order.closed_at();
        self.deleted_at = order.deleted_at();
        self.total = order.total();
    }
}

impl MemoryState {
    fn live_by_number(&self, number: &OrderNumber) -> Option<&StoredOrder> {
        self.orders
            .values()
            .find(|o| &o.number == number && o.deleted_at.is_none())
    }

    fn items(&self) -> impl Iterator<Item = &OrderItem> {
        self.orders.values().flat_map(|o| o.items.iter())
    }

    fn item_mut(&mut self, item_id: OrderItemId) -> Option<&mut OrderItem> {
        self.orders
            .values_mut()
            .flat_map(|o| o.items.iter_mut())
            .find(|i| i.id() == item_id)
    }
}

impl InMemoryDatabase {
    /// Creates a new empty in-memory database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `commit` fail after all writes were staged.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Every outbox message in write order, processed or not.
    pub async fn outbox_messages(&self) -> Vec<OutboxMessage> {
        self.state.lock().await.outbox.clone()
    }

    /// Number of stored order rows, soft-deleted ones included.
    pub async fn stored_order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Clears all orders and outbox messages.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.orders.clear();
        state.outbox.clear();
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryTransaction {
            guard,
            staged,
            fail_commit: Arc::clone(&self.fail_next_commit),
        })
    }
}

/// A staged, exclusive transaction over an [`InMemoryDatabase`].
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_commit: Arc<AtomicBool>,
}

#[async_trait]
impl OrderStore for InMemoryTransaction {
    async fn find_by_number(&mut self, number: &OrderNumber) -> Result<Option<Order>> {
        Ok(self.staged.live_by_number(number).map(StoredOrder::to_order))
    }

    async fn insert_order(&mut self, order: &Order) -> Result<Version> {
        if self.staged.orders.contains_key(&order.id()) {
            return Err(StoreError::DuplicateKey {
                constraint: ORDER_PK_CONSTRAINT.to_string(),
            });
        }
        if self.staged.orders.values().any(|o| &o.number == order.number()) {
            return Err(StoreError::DuplicateKey {
                constraint: ORDER_NUMBER_CONSTRAINT.to_string(),
            });
        }

        let version = Version::first();
        self.staged.orders.insert(
            order.id(),
            StoredOrder {
                id: order.id(),
                number: order.number().clone(),
                client_name: order.client_name().to_string(),
                status: order.status(),
                created_at: order.created_at(),
                updated_at: order.updated_at(),
                closed_at: order.closed_at(),
                deleted_at: order.deleted_at(),
                total: order.total(),
                version,
                items: Vec::new(),
            },
        );
        Ok(version)
    }

    async fn update_order(&mut self, order: &Order) -> Result<Version> {
        let stored = self
            .staged
            .orders
            .get_mut(&order.id())
            .ok_or(StoreError::OrderNotFound(order.id()))?;

        if stored.version != order.version() {
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id(),
                expected: order.version(),
            });
        }

        stored.copy_header(order);
        stored.version = stored.version.next();
        Ok(stored.version)
    }
}

#[async_trait]
impl OrderItemStore for InMemoryTransaction {
    async fn insert_item(&mut self, order_id: AggregateId, item: &OrderItem) -> Result<()> {
        if self.staged.items().any(|i| i.id() == item.id()) {
            return Err(StoreError::DuplicateKey {
                constraint: ITEM_PK_CONSTRAINT.to_string(),
            });
        }
        if self
            .staged
            .items()
            .any(|i| i.product_id() == item.product_id())
        {
            return Err(StoreError::DuplicateKey {
                constraint: PRODUCT_ID_CONSTRAINT.to_string(),
            });
        }

        let stored = self
            .staged
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;
        stored.items.push(item.clone());
        Ok(())
    }

    async fn update_item_quantity(&mut self, item: &OrderItem) -> Result<()> {
        let stored = self
            .staged
            .item_mut(item.id())
            .ok_or(StoreError::ItemNotFound(item.id()))?;
        *stored = item.clone();
        Ok(())
    }

    async fn delete_item(&mut self, item_id: OrderItemId) -> Result<()> {
        for order in self.staged.orders.values_mut() {
            if let Some(index) = order.items.iter().position(|i| i.id() == item_id) {
                order.items.remove(index);
                return Ok(());
            }
        }
        Err(StoreError::ItemNotFound(item_id))
    }
}

#[async_trait]
impl OutboxStore for InMemoryTransaction {
    async fn insert_message(&mut self, message: &OutboxMessage) -> Result<()> {
        if self.staged.outbox.iter().any(|m| m.id == message.id) {
            return Err(StoreError::DuplicateKey {
                constraint: "outbox_messages_pkey".to_string(),
            });
        }
        self.staged.outbox.push(message.clone());
        Ok(())
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(self) -> Result<()> {
        if self.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "commit rejected by in-memory database".to_string(),
            ));
        }

        let InMemoryTransaction {
            mut guard, staged, ..
        } = self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl OrderQueries for InMemoryDatabase {
    async fn get_by_number(&self, number: &OrderNumber) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state.live_by_number(number).map(StoredOrder::to_order))
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<OrderSummary>> {
        let state = self.state.lock().await;
        let mut summaries: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.deleted_at.is_none())
            .map(StoredOrder::summary)
            .filter(|s| query.matches(s))
            .collect();

        // Newest first, id as tie-breaker for identical timestamps
        summaries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(&a.id.as_uuid()))
        });

        let total = summaries.len() as u64;
        let offset = usize::try_from(query.page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.page.limit()).unwrap_or(usize::MAX);
        let items = summaries.into_iter().skip(offset).take(limit).collect();

        Ok(Page::new(items, query.page, total))
    }
}

#[async_trait]
impl OutboxRelay for InMemoryDatabase {
    async fn fetch_unprocessed(&self, limit: usize) -> Result<Vec<OutboxMessage>> {
        let state = self.state.lock().await;
        Ok(state
            .outbox
            .iter()
            .filter(|m| !m.processed)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_processed(&self, ids: &[OutboxId], at: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let mut changed = 0;
        for message in state.outbox.iter_mut() {
            if !message.processed && ids.contains(&message.id) {
                message.mark_processed(at);
                changed += 1;
            }
        }
        Ok(changed)
    }
}
