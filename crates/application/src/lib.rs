//! Order use cases and the machinery that keeps them consistent.
//!
//! This crate provides:
//! - [`UnitOfWork`] committing aggregate changes and outbox rows in one transaction
//! - [`EventPublisher`] delivering committed events to in-process [`EventSubscriber`]s
//! - [`CacheInvalidationSubscriber`] evicting cached orders when they change
//! - [`OrderService`] with the create, mutate, close, delete and query use cases
//! - Read views returned to callers and cached as JSON

pub mod error;
pub mod publisher;
pub mod service;
pub mod subscriber;
pub mod uow;
pub mod views;

pub use error::{AppError, Result};
pub use publisher::{EventPublisher, EventSubscriber, SubscriberError};
pub use service::{DEFAULT_CACHE_TTL, OrderService};
pub use subscriber::CacheInvalidationSubscriber;
pub use uow::UnitOfWork;
pub use views::{OrderItemView, OrderSummaryView, OrderView};
