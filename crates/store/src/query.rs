use chrono::{DateTime, Utc};
use domain::{Money, Order, OrderNumber, OrderStatus};

use crate::{AggregateId, PageRequest};

/// Builder for listing orders.
///
/// Filtering and paging are applied by the backend, so a listing never
/// loads more than one page of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    /// Which page to return.
    pub page: PageRequest,

    /// Only orders in this status.
    pub status: Option<OrderStatus>,
}

impl OrderQuery {
    /// Creates a query for the first page of all live orders.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn status_opt(mut self, status: Option<OrderStatus>) -> Self {
        self.status = status;
        self
    }

    /// Returns true if `summary` passes the status filter.
    pub fn matches(&self, summary: &OrderSummary) -> bool {
        self.status.is_none_or(|s| s == summary.status)
    }
}

/// Header fields of an order, as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub id: AggregateId,
    pub order_number: OrderNumber,
    pub client_name: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub total: Money,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            order_number: order.number().clone(),
            client_name: order.client_name().to_string(),
            status: order.status(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            closed_at: order.closed_at(),
            total: order.total(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let query = OrderQuery::new()
            .page(PageRequest::new(2, 10))
            .status(OrderStatus::Closed);

        assert_eq!(query.page.page(), 2);
        assert_eq!(query.page.page_size(), 10);
        assert_eq!(query.status, Some(OrderStatus::Closed));
    }

    #[test]
    fn matches_applies_status_filter() {
        let order = Order::create("Ana").unwrap();
        let summary = OrderSummary::from(&order);

        assert!(OrderQuery::new().matches(&summary));
        assert!(OrderQuery::new().status(OrderStatus::Open).matches(&summary));
        assert!(!OrderQuery::new().status(OrderStatus::Closed).matches(&summary));
    }
}
