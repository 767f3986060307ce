//! Order domain events.
//!
//! Payload field names are camelCase and form the durable wire contract of
//! the outbox table.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{OrderItem, OrderNumber, ProductId};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was created.
    OrderCreated(OrderCreatedData),

    /// A new line was added.
    ItemAdded(ItemAddedData),

    /// The quantity of an existing line changed and stayed above zero.
    ItemQuantityChanged(ItemQuantityChangedData),

    /// A line left the order, explicitly or because its quantity hit zero.
    ItemRemoved(ItemRemovedData),

    /// Order was closed.
    OrderClosed(OrderClosedData),

    /// Order was soft-deleted.
    OrderDeleted(OrderDeletedData),
}

impl OrderEvent {
    /// Identity of the order that raised this event.
    pub fn order_id(&self) -> AggregateId {
        match self {
            OrderEvent::OrderCreated(d) => d.order_id,
            OrderEvent::ItemAdded(d) => d.order_id,
            OrderEvent::ItemQuantityChanged(d) => d.order_id,
            OrderEvent::ItemRemoved(d) => d.order_id,
            OrderEvent::OrderClosed(d) => d.order_id,
            OrderEvent::OrderDeleted(d) => d.order_id,
        }
    }

    /// Business number of the order that raised this event.
    pub fn order_number(&self) -> &OrderNumber {
        match self {
            OrderEvent::OrderCreated(d) => &d.order_number,
            OrderEvent::ItemAdded(d) => &d.order_number,
            OrderEvent::ItemQuantityChanged(d) => &d.order_number,
            OrderEvent::ItemRemoved(d) => &d.order_number,
            OrderEvent::OrderClosed(d) => &d.order_number,
            OrderEvent::OrderDeleted(d) => &d.order_number,
        }
    }
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "OrderCreated",
            OrderEvent::ItemAdded(_) => "ItemAdded",
            OrderEvent::ItemQuantityChanged(_) => "ItemQuantityChanged",
            OrderEvent::ItemRemoved(_) => "ItemRemoved",
            OrderEvent::OrderClosed(_) => "OrderClosed",
            OrderEvent::OrderDeleted(_) => "OrderDeleted",
        }
    }

    fn occurred_on(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderCreated(d) => d.occurred_on,
            OrderEvent::ItemAdded(d) => d.occurred_on,
            OrderEvent::ItemQuantityChanged(d) => d.occurred_on,
            OrderEvent::ItemRemoved(d) => d.occurred_on,
            OrderEvent::OrderClosed(d) => d.occurred_on,
            OrderEvent::OrderDeleted(d) => d.occurred_on,
        }
    }

    fn payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            OrderEvent::OrderCreated(d) => serde_json::to_value(d),
            OrderEvent::ItemAdded(d) => serde_json::to_value(d),
            OrderEvent::ItemQuantityChanged(d) => serde_json::to_value(d),
            OrderEvent::ItemRemoved(d) => serde_json::to_value(d),
            OrderEvent::OrderClosed(d) => serde_json::to_value(d),
            OrderEvent::OrderDeleted(d) => serde_json::to_value(d),
        }
    }
}

/// Data for OrderCreated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedData {
    pub order_id: AggregateId,
    pub order_number: OrderNumber,
    pub occurred_on: DateTime<Utc>,
}

/// Data for ItemAdded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAddedData {
    pub order_id: AggregateId,
    pub order_number: OrderNumber,
    pub product_id: ProductId,
    pub description: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub occurred_on: DateTime<Utc>,
}

/// Data for ItemQuantityChanged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuantityChangedData {
    pub order_id: AggregateId,
    pub order_number: OrderNumber,
    pub product_id: ProductId,
    pub old_quantity: u32,
    pub new_quantity: u32,
    pub occurred_on: DateTime<Utc>,
}

/// Data for ItemRemoved event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRemovedData {
    pub order_id: AggregateId,
    pub order_number: OrderNumber,
    pub product_id: ProductId,
    pub occurred_on: DateTime<Utc>,
}

/// Data for OrderClosed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderClosedData {
    pub order_id: AggregateId,
    pub order_number: OrderNumber,
    pub closed_at: DateTime<Utc>,
    pub occurred_on: DateTime<Utc>,
}

/// Data for OrderDeleted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDeletedData {
    pub order_id: AggregateId,
    pub order_number: OrderNumber,
    pub deleted_at: DateTime<Utc>,
    pub occurred_on: DateTime<Utc>,
}

// Convenience constructors
impl OrderEvent {
    pub fn order_created(
        order_id: AggregateId,
        order_number: OrderNumber,
        at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::OrderCreated(OrderCreatedData {
            order_id,
            order_number,
            occurred_on: at,
        })
    }

    pub fn item_added(
        order_id: AggregateId,
        order_number: OrderNumber,
        item: &OrderItem,
        at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::ItemAdded(ItemAddedData {
            order_id,
            order_number,
            product_id: item.product_id().clone(),
            description: item.description().to_string(),
            unit_price_cents: item.unit_price().cents(),
            quantity: item.quantity(),
            occurred_on: at,
        })
    }

    pub fn item_quantity_changed(
        order_id: AggregateId,
        order_number: OrderNumber,
        product_id: ProductId,
        old_quantity: u32,
        new_quantity: u32,
        at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::ItemQuantityChanged(ItemQuantityChangedData {
            order_id,
            order_number,
            product_id,
            old_quantity,
            new_quantity,
            occurred_on: at,
        })
    }

    pub fn item_removed(
        order_id: AggregateId,
        order_number: OrderNumber,
        product_id: ProductId,
        at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::ItemRemoved(ItemRemovedData {
            order_id,
            order_number,
            product_id,
            occurred_on: at,
        })
    }

    pub fn order_closed(
        order_id: AggregateId,
        order_number: OrderNumber,
        closed_at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::OrderClosed(OrderClosedData {
            order_id,
            order_number,
            closed_at,
            occurred_on: closed_at,
        })
    }

    pub fn order_deleted(
        order_id: AggregateId,
        order_number: OrderNumber,
        deleted_at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::OrderDeleted(OrderDeletedData {
            order_id,
            order_number,
            deleted_at,
            occurred_on: deleted_at,
        })
    }
}
