//! Unit of work: aggregate changes and their outbox rows in one transaction.

use std::sync::Arc;

use domain::{AggregateRoot, Order, OrderError, OrderEvent, OrderItemId, OrderNumber};
use store::{Database, OrderItemStore, OrderStore, OutboxMessage, OutboxStore, Transaction};

use crate::Result;
use crate::publisher::EventPublisher;

/// Item quantities as they were when an order was loaded.
struct Baseline {
    items: Vec<(OrderItemId, u32)>,
}

impl Baseline {
    fn of(order: &Order) -> Self {
        Self {
            items: order
                .items()
                .iter()
                .map(|item| (item.id(), item.quantity()))
                .collect(),
        }
    }
}

/// An order taking part in the unit of work.
struct Tracked {
    order: Order,
    /// `None` for orders created in this unit of work.
    baseline: Option<Baseline>,
}

/// Tracks orders loaded or created in one storage transaction and commits
/// them together with the outbox rows for their pending events.
///
/// Dropping a unit of work without calling [`commit`](Self::commit) rolls
/// the transaction back, so a cancelled use case never leaves a partial
/// write behind.
pub struct UnitOfWork<D: Database> {
    tx: D::Tx,
    tracked: Vec<Tracked>,
    publisher: Arc<EventPublisher>,
}

impl<D: Database> UnitOfWork<D> {
    /// Opens a transaction on `db`.
    pub async fn begin(db: &D, publisher: Arc<EventPublisher>) -> Result<Self> {
        Ok(Self {
            tx: db.begin().await?,
            tracked: Vec::new(),
            publisher,
        })
    }

    /// Loads a live order by number and starts tracking it.
    ///
    /// Loading the same number twice returns the tracked instance.
    pub async fn find_by_number(&mut self, number: &OrderNumber) -> Result<Option<&mut Order>> {
        if let Some(index) = self.position(number) {
            return Ok(Some(&mut self.tracked[index].order));
        }

        let Some(order) = self.tx.find_by_number(number).await? else {
            return Ok(None);
        };

        self.tracked.push(Tracked {
            baseline: Some(Baseline::of(&order)),
            order,
        });
        Ok(self.tracked.last_mut().map(|t| &mut t.order))
    }

    /// Like [`find_by_number`](Self::find_by_number), failing with
    /// `OrderNotFound` when there is no live order.
    pub async fn get_by_number(&mut self, number: &OrderNumber) -> Result<&mut Order> {
        let order = self.find_by_number(number).await?;
        order.ok_or_else(|| {
            OrderError::OrderNotFound {
                order_number: number.clone(),
            }
            .into()
        })
    }

    /// Starts tracking a newly created order.
    pub fn add(&mut self, order: Order) -> &mut Order {
        self.tracked.push(Tracked {
            order,
            baseline: None,
        });
        let index = self.tracked.len() - 1;
        &mut self.tracked[index].order
    }

    /// Number of tracked orders.
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    fn position(&self, number: &OrderNumber) -> Option<usize> {
        self.tracked
            .iter()
            .position(|t| t.order.number() == number)
    }

    /// Persists every tracked order that raised events, writes one outbox row
    /// per event and commits.
    ///
    /// Orders without pending events are not written, so a commit with
    /// nothing to say produces no outbox rows. Committed events are then
    /// published; subscriber failures do not affect the result.
    ///
    /// Returns the tracked orders with their new versions.
    #[tracing::instrument(skip_all, fields(orders = self.tracked.len()))]
    pub async fn commit(self) -> Result<Vec<Order>> {
        let Self {
            mut tx,
            mut tracked,
            publisher,
        } = self;

        let mut events: Vec<OrderEvent> = Vec::new();
        let mut versions = Vec::with_capacity(tracked.len());

        for entry in &mut tracked {
            if !entry.order.has_pending_events() {
                versions.push(None);
                continue;
            }

            let version = match &entry.baseline {
                None => {
                    let version = tx.insert_order(&entry.order).await?;
                    for item in entry.order.items() {
                        tx.insert_item(entry.order.id(), item).await?;
                    }
                    version
                }
                Some(baseline) => {
                    let version = tx.update_order(&entry.order).await?;
                    sync_items(&mut tx, &entry.order, baseline).await?;
                    version
                }
            };

            let drained = entry.order.take_events();
            let messages = drained
                .iter()
                .map(OutboxMessage::from_event)
                .collect::<store::Result<Vec<_>>>()?;
            tx.insert_messages(&messages).await?;

            metrics::counter!("outbox_messages_written_total").increment(messages.len() as u64);
            tracing::debug!(
                order_number = %entry.order.number(),
                messages = messages.len(),
                "staged order and outbox rows"
            );

            events.extend(drained);
            versions.push(Some(version));
        }

        tx.commit().await?;
        metrics::counter!("uow_commits_total").increment(1);

        let orders = tracked
            .into_iter()
            .zip(versions)
            .map(|(entry, version)| {
                let mut order = entry.order;
                if let Some(version) = version {
                    order.set_version(version);
                }
                order
            })
            .collect();

        if !events.is_empty() {
            publisher.publish(&events).await;
        }

        Ok(orders)
    }

    /// Discards everything staged in this unit of work.
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Writes the item rows that changed since `baseline` was taken.
async fn sync_items<T: Transaction>(
    tx: &mut T,
    order: &Order,
    baseline: &Baseline,
) -> store::Result<()> {
    for item in order.items() {
        match baseline.items.iter().find(|(id, _)| *id == item.id()) {
            None => tx.insert_item(order.id(), item).await?,
            Some((_, quantity)) if *quantity != item.quantity() => {
                tx.update_item_quantity(item).await?
            }
            Some(_) => {}
        }
    }

    for (id, _) in &baseline.items {
        if !order.items().iter().any(|item| item.id() == *id) {
            tx.delete_item(*id).await?;
        }
    }

    Ok(())
}
