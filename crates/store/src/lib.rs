//! Persistence for the order aggregate.
//!
//! Writes go through a [`Transaction`] obtained from a [`Database`]: the
//! order row, its items and the outbox messages describing the change are
//! written together and become visible only on commit. Reads that do not
//! need a transaction go through [`OrderQueries`].

pub mod error;
pub mod memory;
pub mod outbox;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{AggregateId, Page, PageRequest, Version};
pub use error::{Result, StoreError};
pub use memory::{InMemoryDatabase, InMemoryTransaction};
pub use outbox::{OutboxId, OutboxMessage};
pub use postgres::{PostgresDatabase, PostgresTransaction};
pub use query::{OrderQuery, OrderSummary};
pub use store::{
    Database, OrderItemStore, OrderQueries, OrderStore, OutboxRelay, OutboxStore, Transaction,
};
