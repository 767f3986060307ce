//! Core aggregate root and domain event traits.

use chrono::{DateTime, Utc};
use common::{AggregateId, Version};
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    ///
    /// This is the discriminator written to the outbox `type` column.
    fn event_type(&self) -> &'static str;

    /// When the fact happened.
    fn occurred_on(&self) -> DateTime<Utc>;

    /// The durable JSON payload for this event, without the type tag.
    fn payload(&self) -> serde_json::Result<serde_json::Value>;
}

/// Trait for aggregate roots persisted as state.
///
/// Mutations validate their invariants, change state, and record the
/// resulting events in a transient buffer. The buffer is never persisted
/// as aggregate state; it is drained by whoever writes the aggregate.
pub trait AggregateRoot: Send + Sync {
    /// The type of events this aggregate raises.
    type Event: DomainEvent;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    fn id(&self) -> AggregateId;

    /// The persisted version this instance was loaded at.
    fn version(&self) -> Version;

    /// Called by the persistence layer once a commit has moved the row forward.
    fn set_version(&mut self, version: Version);

    /// Events raised since the aggregate was loaded or last drained.
    fn pending_events(&self) -> &[Self::Event];

    /// Drains the pending event buffer.
    ///
    /// Draining twice returns an empty list the second time.
    fn take_events(&mut self) -> Vec<Self::Event>;

    fn has_pending_events(&self) -> bool {
        !self.pending_events().is_empty()
    }
}
