//! Cache key naming for orders.

use common::AggregateId;
use domain::OrderNumber;

/// Key builder for the entries cached per order.
///
/// Orders are read by number, but events carry both the id and the number,
/// so both keys are invalidated together.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderCacheKeys;

impl OrderCacheKeys {
    const PREFIX: &'static str = "order";

    pub fn by_number(number: &OrderNumber) -> String {
        format!("{}:by-number:{}", Self::PREFIX, number)
    }

    pub fn by_id(id: AggregateId) -> String {
        format!("{}:by-id:{}", Self::PREFIX, id)
    }

    /// Every key that may hold a copy of this order.
    pub fn all(id: AggregateId, number: &OrderNumber) -> Vec<String> {
        vec![Self::by_number(number), Self::by_id(id)]
    }
}
