//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, Version};

use crate::OrderError;
use crate::aggregate::AggregateRoot;

use super::{Money, OrderEvent, OrderItem, OrderNumber, OrderStatus, ProductId};

/// Order aggregate root.
///
/// Every mutation checks the order's invariants before touching state, so a
/// rejected call leaves the order exactly as it was. Successful mutations
/// record an [`OrderEvent`] in a transient buffer that the unit of work
/// drains into the outbox on commit.
///
/// Invariant: `total() == sum(item.subtotal())` after every operation.
#[derive(Debug, Clone)]
pub struct Order {
    id: AggregateId,
    number: OrderNumber,
    client_name: String,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    items: Vec<OrderItem>,
    total: Money,

    /// Persisted version this instance was loaded at.
    version: Version,

    /// Events raised since load, never persisted as state.
    pending_events: Vec<OrderEvent>,
}

/// Persisted shape of an order, used to rehydrate the aggregate.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub id: AggregateId,
    pub number: OrderNumber,
    pub client_name: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItem>,
    pub version: Version,
}

impl AggregateRoot for Order {
    type Event = OrderEvent;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn pending_events(&self) -> &[OrderEvent] {
        &self.pending_events
    }

    fn take_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

// Construction
impl Order {
    /// Creates a new open order for `client_name`.
    ///
    /// Stamps the creation time, mints an [`OrderNumber`] and raises
    /// `OrderCreated`.
    pub fn create(client_name: &str) -> Result<Self, OrderError> {
        Self::create_at(client_name, Utc::now())
    }

    /// Same as [`Order::create`] with an explicit creation instant.
    pub fn create_at(client_name: &str, now: DateTime<Utc>) -> Result<Self, OrderError> {
        let client_name = client_name.trim();
        if client_name.is_empty() {
            return Err(OrderError::ClientNameRequired);
        }

        let id = AggregateId::new();
        let number = OrderNumber::generate_at(now);

        Ok(Self {
            id,
            number: number.clone(),
            client_name: client_name.to_string(),
            status: OrderStatus::Open,
            created_at: now,
            updated_at: None,
            closed_at: None,
            deleted_at: None,
            items: Vec::new(),
            total: Money::zero(),
            version: Version::initial(),
            pending_events: vec![OrderEvent::order_created(id, number, now)],
        })
    }

    /// Rehydrates an order from storage. No events are raised.
    pub fn restore(record: OrderRecord) -> Self {
        let total = record.items.iter().map(OrderItem::subtotal).sum();
        Self {
            id: record.id,
            number: record.number,
            client_name: record.client_name,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
            closed_at: record.closed_at,
            deleted_at: record.deleted_at,
            items: record.items,
            total,
            version: record.version,
            pending_events: Vec::new(),
        }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> AggregateId {
        self.id
    }

    pub fn number(&self) -> &OrderNumber {
        &self.number
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns an item by product ID.
    pub fn get_item(&self, product_id: &ProductId) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.product_id() == product_id)
    }

    /// Finds the line matching description and unit price, if any.
    pub fn find_line(&self, description: &str, unit_price: Money) -> Option<&OrderItem> {
        self.items
            .iter()
            .find(|i| i.is_same_line(description, unit_price))
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }
}

// Command methods
impl Order {
    /// Appends a validated item and adds its subtotal to the total.
    pub fn add_item(&mut self, item: OrderItem) -> Result<(), OrderError> {
        self.ensure_open("add items")?;

        let total = self
            .total
            .checked_add(item.subtotal())
            .ok_or(OrderError::AmountOverflow { what: "order total" })?;

        let now = Utc::now();
        self.total = total;
        self.pending_events.push(OrderEvent::item_added(
            self.id,
            self.number.clone(),
            &item,
            now,
        ));
        self.items.push(item);
        self.updated_at = Some(now);
        Ok(())
    }

    /// Adds `quantity` units of a line.
    ///
    /// When a line with the same description and unit price already exists
    /// the quantity is merged into it instead of creating a duplicate row.
    /// Returns the product id of the affected line.
    pub fn add_line(
        &mut self,
        description: &str,
        unit_price: Money,
        quantity: i64,
    ) -> Result<ProductId, OrderError> {
        self.ensure_open("add items")?;

        let candidate = OrderItem::new(description, unit_price, quantity)?;

        if let Some(existing) = self.find_line(candidate.description(), unit_price) {
            let product_id = existing.product_id().clone();
            self.update_item_quantity(&product_id, i64::from(candidate.quantity()))?;
            return Ok(product_id);
        }

        let product_id = candidate.product_id().clone();
        self.add_item(candidate)?;
        Ok(product_id)
    }

    /// Changes a line's quantity by `delta`.
    ///
    /// A result below zero is rejected without touching state. A result of
    /// exactly zero removes the line. Otherwise the old subtotal is taken off
    /// the total before the new one is added. A zero delta is a no-op.
    pub fn update_item_quantity(
        &mut self,
        product_id: &ProductId,
        delta: i64,
    ) -> Result<(), OrderError> {
        self.ensure_open("change item quantities")?;

        let index = self.item_index(product_id)?;
        let current = self.items[index].quantity();
        // Only a positive delta can overflow since `current` is non-negative
        let target = i64::from(current)
            .checked_add(delta)
            .ok_or(OrderError::InvalidQuantity { quantity: delta })?;

        if target < 0 {
            return Err(OrderError::NegativeQuantity {
                product_id: product_id.clone(),
                current,
                delta,
            });
        }
        if delta == 0 {
            return Ok(());
        }
        if target == 0 {
            self.remove_at(index);
            return Ok(());
        }

        let new_quantity = OrderItem::check_quantity(target)?;
        let item = &self.items[index];
        let old_subtotal = item.subtotal();
        let new_subtotal = OrderItem::checked_subtotal(item.unit_price(), new_quantity)?;
        let total = self
            .total
            .checked_subtract(old_subtotal)
            .and_then(|t| t.checked_add(new_subtotal))
            .ok_or(OrderError::AmountOverflow { what: "order total" })?;

        let now = Utc::now();
        self.items[index].set_quantity(new_quantity);
        self.total = total;
        self.updated_at = Some(now);
        self.pending_events.push(OrderEvent::item_quantity_changed(
            self.id,
            self.number.clone(),
            product_id.clone(),
            current,
            new_quantity,
            now,
        ));
        Ok(())
    }

    /// Removes a line entirely and subtracts its subtotal.
    pub fn remove_item(&mut self, product_id: &ProductId) -> Result<(), OrderError> {
        self.ensure_open("remove items")?;
        let index = self.item_index(product_id)?;
        self.remove_at(index);
        Ok(())
    }

    /// Closes the order.
    ///
    /// Requires an open order with at least one item. Stamps
    /// `closed_at = updated_at = now` and raises `OrderClosed`.
    pub fn close(&mut self) -> Result<(), OrderError> {
        if !self.status.can_close() {
            return Err(OrderError::AlreadyClosed {
                order_number: self.number.clone(),
            });
        }
        if !self.has_items() {
            return Err(OrderError::NoItems {
                order_number: self.number.clone(),
            });
        }

        let now = Utc::now();
        self.status = OrderStatus::Closed;
        self.closed_at = Some(now);
        self.updated_at = Some(now);
        self.pending_events
            .push(OrderEvent::order_closed(self.id, self.number.clone(), now));
        Ok(())
    }

    /// Marks the order as deleted. The row is kept but hidden from reads.
    pub fn soft_delete(&mut self) {
        if self.deleted_at.is_some() {
            return;
        }
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.updated_at = Some(now);
        self.pending_events
            .push(OrderEvent::order_deleted(self.id, self.number.clone(), now));
    }

    fn ensure_open(&self, action: &'static str) -> Result<(), OrderError> {
        if self.status.can_modify_items() {
            Ok(())
        } else {
            Err(OrderError::OrderClosed {
                order_number: self.number.clone(),
                action,
            })
        }
    }

    fn item_index(&self, product_id: &ProductId) -> Result<usize, OrderError> {
        self.items
            .iter()
            .position(|i| i.product_id() == product_id)
            .ok_or_else(|| OrderError::ItemNotFound {
                order_number: self.number.clone(),
                product_id: product_id.clone(),
            })
    }

    fn remove_at(&mut self, index: usize) {
        let now = Utc::now();
        let item = self.items.remove(index);
        self.total -= item.subtotal();
        self.updated_at = Some(now);
        self.pending_events.push(OrderEvent::item_removed(
            self.id,
            self.number.clone(),
            item.product_id().clone(),
            now,
        ));
    }
}
