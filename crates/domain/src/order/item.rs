//! Order line entity.

use serde::{Deserialize, Serialize};

use super::{Money, OrderItemId, ProductId};
use crate::OrderError;

/// A line of an order.
///
/// Items are owned by exactly one order and only change through the
/// aggregate. The subtotal is always derived from price and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    id: OrderItemId,
    product_id: ProductId,
    description: String,
    unit_price: Money,
    quantity: u32,
}

impl OrderItem {
    pub const MAX_DESCRIPTION_LEN: usize = 200;

    /// Largest quantity a single line can hold; matches the `INTEGER`
    /// quantity column.
    pub const MAX_QUANTITY: u32 = i32::MAX as u32;

    /// Creates a validated line with a freshly generated product id.
    ///
    /// The description is trimmed and must be non-empty and at most
    /// [`OrderItem::MAX_DESCRIPTION_LEN`] characters; price and quantity
    /// must both be positive, the quantity at most [`OrderItem::MAX_QUANTITY`]
    /// and the resulting subtotal must fit in `i64` cents.
    pub fn new(description: &str, unit_price: Money, quantity: i64) -> Result<Self, OrderError> {
        let description = Self::normalize_description(description)?;

        if !unit_price.is_positive() {
            return Err(OrderError::InvalidUnitPrice {
                cents: unit_price.cents(),
            });
        }

        let quantity = Self::check_quantity(quantity)?;
        Self::checked_subtotal(unit_price, quantity)?;

        Ok(Self {
            id: OrderItemId::new(),
            product_id: ProductId::generate(),
            description,
            unit_price,
            quantity,
        })
    }

    /// Rebuilds an item from persisted state without re-validating it.
    pub fn restore(
        id: OrderItemId,
        product_id: ProductId,
        description: String,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            id,
            product_id,
            description,
            unit_price,
            quantity,
        }
    }

    pub(crate) fn normalize_description(description: &str) -> Result<String, OrderError> {
        let trimmed = description.trim();
        if trimmed.is_empty() {
            return Err(OrderError::DescriptionRequired);
        }
        let length = trimmed.chars().count();
        if length > Self::MAX_DESCRIPTION_LEN {
            return Err(OrderError::DescriptionTooLong {
                length,
                max: Self::MAX_DESCRIPTION_LEN,
            });
        }
        Ok(trimmed.to_string())
    }

    /// Accepts quantities in `1..=MAX_QUANTITY`.
    pub(crate) fn check_quantity(quantity: i64) -> Result<u32, OrderError> {
        match u32::try_from(quantity) {
            Ok(q) if q > 0 && q <= Self::MAX_QUANTITY => Ok(q),
            _ => Err(OrderError::InvalidQuantity { quantity }),
        }
    }

    pub(crate) fn checked_subtotal(unit_price: Money, quantity: u32) -> Result<Money, OrderError> {
        unit_price
            .checked_multiply(quantity)
            .ok_or(OrderError::AmountOverflow { what: "line subtotal" })
    }

    pub fn id(&self) -> OrderItemId {
        self.id
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Returns the line total (unit_price * quantity).
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    /// Two lines are the same when description and unit price match.
    pub fn is_same_line(&self, description: &str, unit_price: Money) -> bool {
        self.description == description && self.unit_price == unit_price
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}
