//! Order status state machine.

use serde::{Deserialize, Serialize};

use crate::OrderError;

/// The status of an order in its lifecycle.
///
/// ```text
/// Open ──close()──► Closed
/// ```
///
/// `Open` is the initial status and `Closed` is terminal; no other
/// transitions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Items can be added, changed and removed.
    #[default]
    Open,

    /// The order is immutable (terminal state).
    Closed,
}

impl OrderStatus {
    /// Returns true if items can be modified in this status.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderStatus::Open)
    }

    /// Returns true if the order can be closed in this status.
    pub fn can_close(&self) -> bool {
        matches!(self, OrderStatus::Open)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Closed)
    }

    /// Returns the status name as stored and rendered.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "Open",
            OrderStatus::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    /// Case-insensitive, so query strings like `?status=closed` work.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(OrderStatus::Open),
            "closed" => Ok(OrderStatus::Closed),
            _ => Err(OrderError::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }
}
