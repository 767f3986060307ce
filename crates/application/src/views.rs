//! Read views of orders.
//!
//! `OrderView` is what single-order reads return and what the cache holds,
//! so its JSON shape is stable.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Order, OrderItem, OrderStatus};
use serde::{Deserialize, Serialize};
use store::OrderSummary;

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub product_id: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id().to_string(),
            description: item.description().to_string(),
            quantity: item.quantity(),
            unit_price_cents: item.unit_price().cents(),
            subtotal_cents: item.subtotal().cents(),
        }
    }
}

/// A full order with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: AggregateId,
    pub order_number: String,
    pub client_name: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub total_cents: i64,
    pub items: Vec<OrderItemView>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            order_number: order.number().to_string(),
            client_name: order.client_name().to_string(),
            status: order.status(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            closed_at: order.closed_at(),
            total_cents: order.total().cents(),
            items: order.items().iter().map(OrderItemView::from).collect(),
        }
    }
}

/// Order header fields, as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryView {
    pub id: AggregateId,
    pub order_number: String,
    pub client_name: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub total_cents: i64,
}

impl From<OrderSummary> for OrderSummaryView {
    fn from(summary: OrderSummary) -> Self {
        Self {
            id: summary.id,
            order_number: summary.order_number.to_string(),
            client_name: summary.client_name,
            status: summary.status,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
            closed_at: summary.closed_at,
            total_cents: summary.total.cents(),
        }
    }
}
