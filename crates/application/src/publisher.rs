//! In-process delivery of committed domain events.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{DomainEvent, OrderEvent};
use futures_util::future::join_all;
use thiserror::Error;

/// Error reported by a subscriber. Logged by the publisher, never propagated.
#[derive(Debug, Error)]
pub enum SubscriberError {
    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("{0}")]
    Other(String),
}

/// A consumer of committed order events.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Returns the name of this subscriber.
    fn name(&self) -> &'static str;

    /// Handles one event.
    async fn handle(&self, event: &OrderEvent) -> Result<(), SubscriberError>;
}

/// Delivers events to every registered subscriber after a commit.
///
/// Events are delivered in commit order. For each event all subscribers run
/// concurrently, and a failing subscriber affects neither the others nor
/// the caller.
#[derive(Default)]
pub struct EventPublisher {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventPublisher {
    /// Creates a publisher with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber with this publisher.
    pub fn register(&mut self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Delivers `events` to all subscribers.
    #[tracing::instrument(skip_all, fields(events = events.len()))]
    pub async fn publish(&self, events: &[OrderEvent]) {
        for event in events {
            let deliveries = self
                .subscribers
                .iter()
                .map(|subscriber| async move { (subscriber.name(), subscriber.handle(event).await) });

            for (name, result) in join_all(deliveries).await {
                if let Err(e) = result {
                    metrics::counter!("event_subscriber_failures_total").increment(1);
                    tracing::warn!(
                        subscriber = name,
                        event_type = event.event_type(),
                        order_number = %event.order_number(),
                        error = %e,
                        "subscriber failed to handle event"
                    );
                }
            }

            metrics::counter!("events_published_total").increment(1);
        }
    }
}
