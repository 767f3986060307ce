//! Cache invalidation on committed order events.

use std::sync::Arc;

use async_trait::async_trait;
use cache::{Cache, CacheExt, OrderCacheKeys};
use domain::OrderEvent;

use crate::publisher::{EventSubscriber, SubscriberError};

/// Evicts every cached copy of an order when that order changes.
///
/// Runs for every order event, so item changes are never masked by a cached
/// view. Failed removals are not retried; the entry expires at its TTL.
pub struct CacheInvalidationSubscriber {
    cache: Arc<dyn Cache>,
}

impl CacheInvalidationSubscriber {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl EventSubscriber for CacheInvalidationSubscriber {
    fn name(&self) -> &'static str {
        "CacheInvalidationSubscriber"
    }

    async fn handle(&self, event: &OrderEvent) -> Result<(), SubscriberError> {
        let keys = OrderCacheKeys::all(event.order_id(), event.order_number());

        if let Err(e) = self.cache.remove_all(&keys).await {
            metrics::counter!("cache_errors_total").increment(1);
            return Err(e.into());
        }

        tracing::debug!(order_number = %event.order_number(), "evicted cached order");
        Ok(())
    }
}
