//! Order service integration tests
//!
//! These run the use cases end to end against the in-memory database and
//! cache, with the cache invalidation subscriber wired in as in production.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use application::{
    AppError, CacheInvalidationSubscriber, EventPublisher, EventSubscriber, OrderService,
    SubscriberError,
};
use async_trait::async_trait;
use cache::{Cache, CacheError, InMemoryCache, OrderCacheKeys};
use domain::{DomainEvent, ErrorKind, OrderEvent, OrderNumber, OrderStatus};
use store::{InMemoryDatabase, OrderQueries, OutboxRelay};
use tokio::sync::Mutex;

/// Records the type of every event it sees.
#[derive(Default)]
struct RecordingSubscriber {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl EventSubscriber for RecordingSubscriber {
    fn name(&self) -> &'static str {
        "RecordingSubscriber"
    }

    async fn handle(&self, event: &OrderEvent) -> Result<(), SubscriberError> {
        self.seen.lock().await.push(event.event_type().to_string());
        Ok(())
    }
}

/// A cache whose backend can be switched off.
#[derive(Clone, Default)]
struct FlakyCache {
    inner: InMemoryCache,
    down: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl FlakyCache {
    fn check(&self) -> cache::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for FlakyCache {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn get(&self, key: &str) -> cache::Result<Option<String>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> cache::Result<()> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn remove(&self, key: &str) -> cache::Result<()> {
        self.check()?;
        self.inner.remove(key).await
    }
}

struct Harness {
    service: OrderService<InMemoryDatabase>,
    db: InMemoryDatabase,
    cache: FlakyCache,
    recorder: Arc<RecordingSubscriber>,
}

fn harness() -> Harness {
    let db = InMemoryDatabase::new();
    let cache = FlakyCache::default();
    let recorder = Arc::new(RecordingSubscriber::default());

    let mut publisher = EventPublisher::new();
    publisher.register(Arc::new(CacheInvalidationSubscriber::new(Arc::new(
        cache.clone(),
    ))));
    publisher.register(recorder.clone());

    let service = OrderService::new(db.clone(), Arc::new(publisher), Arc::new(cache.clone()));

    Harness {
        service,
        db,
        cache,
        recorder,
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn ana_scenario() {
        let h = harness();
        let order = h.service.create_order("Ana").await.unwrap();
        let number = order.order_number.clone();

        let view = h.service.add_item(&number, "Widget", 1000, 3).await.unwrap();
        assert_eq!(view.total_cents, 3000);
        assert_eq!(view.status, OrderStatus::Open);

        // Same description and price merges into the existing line
        let view = h.service.add_item(&number, "Widget", 1000, 1).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 4);
        assert_eq!(view.total_cents, 4000);

        let widget = view.items[0].product_id.clone();
        let view = h.service.remove_item(&number, &widget).await.unwrap();
        assert_eq!(view.total_cents, 0);
        assert!(view.items.is_empty());

        let err = h.service.close_order(&number).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidState));

        h.service.add_item(&number, "Gadget", 500, 1).await.unwrap();
        let view = h.service.close_order(&number).await.unwrap();
        assert_eq!(view.status, OrderStatus::Closed);
        assert!(view.closed_at.is_some());
        assert_eq!(view.total_cents, 500);

        let read = h.service.get_by_number(&number).await.unwrap();
        assert_eq!(read.status, OrderStatus::Closed);
        assert_eq!(read.items.len(), 1);
        assert_eq!(read.items[0].description, "Gadget");
    }

    #[tokio::test]
    async fn every_write_lands_in_outbox_and_is_published() {
        let h = harness();
        let order = h.service.create_order("Ana").await.unwrap();
        let number = order.order_number.clone();
        let view = h.service.add_item(&number, "Widget", 1000, 2).await.unwrap();
        let widget = view.items[0].product_id.clone();
        h.service
            .update_item_quantity(&number, &widget, 1)
            .await
            .unwrap();
        h.service.close_order(&number).await.unwrap();

        let expected = vec![
            "OrderCreated",
            "ItemAdded",
            "ItemQuantityChanged",
            "OrderClosed",
        ];

        let outbox = h.db.fetch_unprocessed(100).await.unwrap();
        let types: Vec<_> = outbox.iter().map(|m| m.message_type.as_str()).collect();
        assert_eq!(types, expected);
        assert!(outbox.iter().all(|m| m.payload["orderNumber"] == number.as_str()));

        assert_eq!(*h.recorder.seen.lock().await, expected);
    }

    #[tokio::test]
    async fn rejected_mutation_writes_nothing() {
        let h = harness();
        let order = h.service.create_order("Ana").await.unwrap();
        let number = order.order_number.clone();
        let before = h.db.outbox_messages().await.len();

        let err = h.service.add_item(&number, "Widget", 1000, 0).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Validation));

        let err = h.service.close_order(&number).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidState));

        assert_eq!(h.db.outbox_messages().await.len(), before);
    }

    #[tokio::test]
    async fn negative_quantity_leaves_state_unchanged() {
        let h = harness();
        let order = h.service.create_order("Ana").await.unwrap();
        let number = order.order_number.clone();
        let view = h.service.add_item(&number, "Widget", 1000, 2).await.unwrap();
        let widget = view.items[0].product_id.clone();

        let err = h
            .service
            .update_item_quantity(&number, &widget, -3)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidState));

        let read = h.service.get_by_number(&number).await.unwrap();
        assert_eq!(read.items[0].quantity, 2);
        assert_eq!(read.total_cents, 2000);
    }

    #[tokio::test]
    async fn closed_order_rejects_mutations() {
        let h = harness();
        let order = h.service.create_order("Ana").await.unwrap();
        let number = order.order_number.clone();
        let view = h.service.add_item(&number, "Widget", 1000, 1).await.unwrap();
        let widget = view.items[0].product_id.clone();
        h.service.close_order(&number).await.unwrap();

        for err in [
            h.service.add_item(&number, "Gadget", 500, 1).await.unwrap_err(),
            h.service.remove_item(&number, &widget).await.unwrap_err(),
            h.service.close_order(&number).await.unwrap_err(),
        ] {
            assert_eq!(err.kind(), Some(ErrorKind::InvalidState));
        }
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let h = harness();
        let order = h.service.create_order("Ana").await.unwrap();

        let err = h
            .service
            .remove_item(&order.order_number, "PRD-missing")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn deleted_order_disappears() {
        let h = harness();
        let order = h.service.create_order("Ana").await.unwrap();
        let number = order.order_number.clone();
        h.service.get_by_number(&number).await.unwrap();

        h.service.delete_order(&number).await.unwrap();

        let err = h.service.get_by_number(&number).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
        let err = h.service.delete_order(&number).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));

        let page = h.service.list_orders(0, 25, None).await.unwrap();
        assert_eq!(page.total_items, 0);
        assert_eq!(h.db.stored_order_count().await, 1);
    }
}

mod cache_aside {
    use super::*;

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let h = harness();
        let order = h.service.create_order("Ana").await.unwrap();
        let number = order.order_number.clone();

        let first = h.service.get_by_number(&number).await.unwrap();
        let key = OrderCacheKeys::by_number(&OrderNumber::parse(&number).unwrap());
        assert!(h.cache.inner.get(&key).await.unwrap().is_some());

        // Remove the row behind the cache's back; the cached view still answers
        h.db.clear().await;
        let second = h.service.get_by_number(&number).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn commit_evicts_cached_view() {
        let h = harness();
        let order = h.service.create_order("Ana").await.unwrap();
        let number = order.order_number.clone();
        h.service.add_item(&number, "Widget", 1000, 1).await.unwrap();
        h.service.get_by_number(&number).await.unwrap();

        h.service.close_order(&number).await.unwrap();

        let parsed = OrderNumber::parse(&number).unwrap();
        assert!(
            h.cache
                .inner
                .get(&OrderCacheKeys::by_number(&parsed))
                .await
                .unwrap()
                .is_none()
        );
        let read = h.service.get_by_number(&number).await.unwrap();
        assert_eq!(read.status, OrderStatus::Closed);
    }

    #[tokio::test]
    async fn item_change_is_not_masked_by_cache() {
        let h = harness();
        let order = h.service.create_order("Ana").await.unwrap();
        let number = order.order_number.clone();
        h.service.get_by_number(&number).await.unwrap();

        h.service.add_item(&number, "Widget", 1000, 2).await.unwrap();

        let read = h.service.get_by_number(&number).await.unwrap();
        assert_eq!(read.total_cents, 2000);
    }

    #[tokio::test]
    async fn cache_outage_degrades_to_store_reads() {
        let h = harness();
        let order = h.service.create_order("Ana").await.unwrap();
        let number = order.order_number.clone();

        h.cache.down.store(true, Ordering::SeqCst);

        let read = h.service.get_by_number(&number).await.unwrap();
        assert_eq!(read.client_name, "Ana");

        // Writes succeed too; failed invalidation is logged, not surfaced
        let view = h.service.add_item(&number, "Widget", 1000, 1).await.unwrap();
        assert_eq!(view.total_cents, 1000);
        assert!(h.cache.calls.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn listings_bypass_cache() {
        let h = harness();
        h.service.create_order("Ana").await.unwrap();
        let calls = h.cache.calls.load(Ordering::SeqCst);

        let page = h.service.list_orders(0, 25, None).await.unwrap();

        assert_eq!(page.total_items, 1);
        assert_eq!(h.cache.calls.load(Ordering::SeqCst), calls);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn out_of_range_paging_is_clamped() {
        let h = harness();
        for name in ["Ana", "Bea", "Cy"] {
            h.service.create_order(name).await.unwrap();
        }

        let clamped = h.service.list_orders(-1, -1, None).await.unwrap();
        let default = h.service.list_orders(0, 25, None).await.unwrap();

        assert_eq!(clamped, default);
        assert_eq!(clamped.page, 0);
        assert_eq!(clamped.page_size, 25);
        assert_eq!(clamped.total_pages, 1);
    }

    #[tokio::test]
    async fn status_filter_and_page_math() {
        let h = harness();
        for name in ["Ana", "Bea", "Cy", "Dee", "Eve"] {
            let order = h.service.create_order(name).await.unwrap();
            h.service
                .add_item(&order.order_number, "Widget", 100, 1)
                .await
                .unwrap();
            if name != "Eve" {
                h.service.close_order(&order.order_number).await.unwrap();
            }
        }

        let closed = h.service.list_orders(1, 3, Some("Closed")).await.unwrap();
        assert_eq!(closed.total_items, 4);
        assert_eq!(closed.total_pages, 2);
        assert_eq!(closed.items.len(), 1);
        assert!(closed.items.iter().all(|o| o.status == OrderStatus::Closed));

        let open = h.service.list_orders(0, 25, Some("open")).await.unwrap();
        assert_eq!(open.total_items, 1);
        assert_eq!(open.items[0].client_name, "Eve");
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn failed_commit_rolls_back_and_publishes_nothing() {
        let h = harness();
        let order = h.service.create_order("Ana").await.unwrap();
        let number = order.order_number.clone();
        let published = h.recorder.seen.lock().await.len();
        let before = h.db.outbox_messages().await.len();

        h.db.fail_next_commit();
        let err = h.service.add_item(&number, "Widget", 1000, 1).await.unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(h.db.outbox_messages().await.len(), before);
        assert_eq!(h.recorder.seen.lock().await.len(), published);
        let stored = h
            .db
            .get_by_number(&OrderNumber::parse(&number).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(stored.items().is_empty());
    }

    #[tokio::test]
    async fn cancelled_use_case_leaves_no_partial_write() {
        let h = harness();
        let order = h.service.create_order("Ana").await.unwrap();
        let number = order.order_number.clone();
        let before = h.db.outbox_messages().await.len();

        // Hold the database so the use case stalls, then cancel it by timing out
        let blocker = store::Database::begin(&h.db).await.unwrap();
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            h.service.add_item(&number, "Widget", 1000, 1),
        )
        .await;
        drop(blocker);

        assert!(result.is_err());
        assert_eq!(h.db.outbox_messages().await.len(), before);
        let read = h.service.get_by_number(&number).await.unwrap();
        assert!(read.items.is_empty());
    }

    #[tokio::test]
    async fn subscriber_failure_does_not_fail_request() {
        struct Exploding;

        #[async_trait]
        impl EventSubscriber for Exploding {
            fn name(&self) -> &'static str {
                "Exploding"
            }

            async fn handle(&self, _event: &OrderEvent) -> Result<(), SubscriberError> {
                Err(SubscriberError::Other("downstream mirror offline".to_string()))
            }
        }

        let db = InMemoryDatabase::new();
        let mut publisher = EventPublisher::new();
        publisher.register(Arc::new(Exploding));
        let service = OrderService::new(
            db.clone(),
            Arc::new(publisher),
            Arc::new(InMemoryCache::new()),
        );

        let order = service.create_order("Ana").await.unwrap();

        assert_eq!(db.stored_order_count().await, 1);
        assert_eq!(order.client_name, "Ana");
    }
}
