//! Order use cases.

use std::sync::Arc;
use std::time::Duration;

use cache::{Cache, CacheExt, OrderCacheKeys};
use common::{Page, PageRequest};
use domain::{Money, Order, OrderError, OrderNumber, OrderStatus, ProductId};
use store::{Database, OrderQueries, OrderQuery, StoreError};

use crate::publisher::EventPublisher;
use crate::uow::UnitOfWork;
use crate::views::{OrderSummaryView, OrderView};
use crate::{AppError, Result};

/// How long a cached order view stays valid.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Attempts at creating an order before giving up on number collisions.
const MAX_NUMBER_ATTEMPTS: u32 = 3;

/// Service exposing the order use cases.
///
/// Every write runs in its own [`UnitOfWork`]. Single-order reads go
/// through the cache; listings always hit the database.
pub struct OrderService<D> {
    db: D,
    publisher: Arc<EventPublisher>,
    cache: Arc<dyn Cache>,
    cache_ttl: Duration,
}

impl<D> OrderService<D>
where
    D: Database + OrderQueries,
{
    /// Creates a new order service.
    ///
    /// `publisher` should carry a cache invalidation subscriber bound to the
    /// same `cache`, or reads may serve stale views until the TTL expires.
    pub fn new(db: D, publisher: Arc<EventPublisher>, cache: Arc<dyn Cache>) -> Self {
        Self {
            db,
            publisher,
            cache,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Returns a reference to the underlying database.
    pub fn database(&self) -> &D {
        &self.db
    }

    /// Name of the cache backend serving reads.
    pub fn cache_name(&self) -> &'static str {
        self.cache.name()
    }

    async fn begin(&self) -> Result<UnitOfWork<D>> {
        UnitOfWork::begin(&self.db, self.publisher.clone()).await
    }

    /// Commits `uow` and returns the view of the order numbered `number`.
    async fn commit_view(uow: UnitOfWork<D>, number: &OrderNumber) -> Result<OrderView> {
        let orders = uow.commit().await?;
        orders
            .iter()
            .find(|o| o.number() == number)
            .map(OrderView::from)
            .ok_or_else(|| {
                OrderError::OrderNotFound {
                    order_number: number.clone(),
                }
                .into()
            })
    }

    /// Creates an open order for `client_name`.
    ///
    /// A generated number that collides with an existing order is
    /// regenerated a bounded number of times.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, client_name: &str) -> Result<OrderView> {
        let mut attempt = 1;
        loop {
            let order = Order::create(client_name)?;
            let number = order.number().clone();
            let mut uow = self.begin().await?;
            uow.add(order);

            match Self::commit_view(uow, &number).await {
                Ok(view) => {
                    metrics::counter!("orders_created_total").increment(1);
                    tracing::info!(order_number = %number, "order created");
                    return Ok(view);
                }
                Err(AppError::Storage(StoreError::DuplicateKey { ref constraint }))
                    if constraint.contains("order_number") && attempt < MAX_NUMBER_ATTEMPTS =>
                {
                    tracing::warn!(order_number = %number, attempt, "order number collision, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Adds a line to an open order, merging it into an existing line with
    /// the same description and unit price.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        order_number: &str,
        description: &str,
        unit_price_cents: i64,
        quantity: i64,
    ) -> Result<OrderView> {
        let number = OrderNumber::parse(order_number)?;
        let mut uow = self.begin().await?;

        let order = uow.get_by_number(&number).await?;
        let product_id = order.add_line(description, Money::from_cents(unit_price_cents), quantity)?;

        let view = Self::commit_view(uow, &number).await?;
        metrics::counter!("order_items_added_total").increment(1);
        tracing::info!(order_number = %number, %product_id, "item added");
        Ok(view)
    }

    /// Changes a line's quantity by `delta`; a line reaching zero is removed.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        order_number: &str,
        product_id: &str,
        delta: i64,
    ) -> Result<OrderView> {
        let number = OrderNumber::parse(order_number)?;
        let product_id = ProductId::parse(product_id)?;
        let mut uow = self.begin().await?;

        let order = uow.get_by_number(&number).await?;
        let was_present = order.get_item(&product_id).is_some();
        order.update_item_quantity(&product_id, delta)?;
        let removed = was_present && order.get_item(&product_id).is_none();

        let view = Self::commit_view(uow, &number).await?;
        if removed {
            metrics::counter!("order_items_removed_total").increment(1);
        }
        Ok(view)
    }

    /// Removes a line from an open order.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, order_number: &str, product_id: &str) -> Result<OrderView> {
        let number = OrderNumber::parse(order_number)?;
        let product_id = ProductId::parse(product_id)?;
        let mut uow = self.begin().await?;

        uow.get_by_number(&number).await?.remove_item(&product_id)?;

        let view = Self::commit_view(uow, &number).await?;
        metrics::counter!("order_items_removed_total").increment(1);
        tracing::info!(order_number = %number, %product_id, "item removed");
        Ok(view)
    }

    /// Closes an open order that has at least one item.
    #[tracing::instrument(skip(self))]
    pub async fn close_order(&self, order_number: &str) -> Result<OrderView> {
        let number = OrderNumber::parse(order_number)?;
        let mut uow = self.begin().await?;

        uow.get_by_number(&number).await?.close()?;

        let view = Self::commit_view(uow, &number).await?;
        metrics::counter!("orders_closed_total").increment(1);
        tracing::info!(order_number = %number, "order closed");
        Ok(view)
    }

    /// Soft-deletes an order. It disappears from every read afterwards.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_number: &str) -> Result<()> {
        let number = OrderNumber::parse(order_number)?;
        let mut uow = self.begin().await?;

        uow.get_by_number(&number).await?.soft_delete();

        uow.commit().await?;
        tracing::info!(order_number = %number, "order deleted");
        Ok(())
    }

    /// Cache-aside lookup of a single order.
    ///
    /// Cache failures are logged and treated as a miss.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_number(&self, order_number: &str) -> Result<OrderView> {
        let number = OrderNumber::parse(order_number)?;
        let key = OrderCacheKeys::by_number(&number);

        match self.cache.get_json::<OrderView>(&key).await {
            Ok(Some(view)) => {
                metrics::counter!("order_cache_hits_total").increment(1);
                return Ok(view);
            }
            Ok(None) => {}
            Err(e) => {
                metrics::counter!("cache_errors_total").increment(1);
                tracing::warn!(cache = self.cache.name(), key = %key, error = %e, "cache read failed");
            }
        }
        metrics::counter!("order_cache_misses_total").increment(1);

        let order = self
            .db
            .get_by_number(&number)
            .await?
            .ok_or(OrderError::OrderNotFound {
                order_number: number,
            })?;
        let view = OrderView::from(&order);

        if let Err(e) = self.cache.set_json(&key, &view, self.cache_ttl).await {
            metrics::counter!("cache_errors_total").increment(1);
            tracing::warn!(cache = self.cache.name(), key = %key, error = %e, "cache write failed");
        }

        Ok(view)
    }

    /// Lists live orders newest first. `page` and `page_size` are clamped,
    /// and an unknown `status` is a validation error.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: i64,
        page_size: i64,
        status: Option<&str>,
    ) -> Result<Page<OrderSummaryView>> {
        let status = status.map(str::parse::<OrderStatus>).transpose()?;
        let query = OrderQuery::new()
            .page(PageRequest::new(page, page_size))
            .status_opt(status);

        let page = self.db.list_orders(&query).await?;
        Ok(page.map(OrderSummaryView::from))
    }
}
