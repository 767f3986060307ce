//! Outbox records written alongside aggregate changes.

use chrono::{DateTime, Utc};
use domain::DomainEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

/// Unique identifier for an outbox message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutboxId(Uuid);

impl OutboxId {
    /// Creates a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OutboxId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OutboxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A durable record of one domain event, waiting for an external relay.
///
/// The row shape (`id, occurred_on, type, payload, processed, processed_on`)
/// is the contract for any process draining the outbox table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: OutboxId,
    pub occurred_on: DateTime<Utc>,
    /// Event type name, e.g. `OrderClosed`.
    pub message_type: String,
    pub payload: serde_json::Value,
    pub processed: bool,
    pub processed_on: Option<DateTime<Utc>>,
}

impl OutboxMessage {
    /// Serializes a domain event into an unprocessed outbox message.
    pub fn from_event<E: DomainEvent>(event: &E) -> Result<Self> {
        Ok(Self {
            id: OutboxId::new(),
            occurred_on: event.occurred_on(),
            message_type: event.event_type().to_string(),
            payload: event.payload()?,
            processed: false,
            processed_on: None,
        })
    }

    pub fn mark_processed(&mut self, at: DateTime<Utc>) {
        self.processed = true;
        self.processed_on = Some(at);
    }
}
