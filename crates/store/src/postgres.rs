use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    AggregateRoot, Money, Order, OrderItem, OrderItemId, OrderNumber, OrderRecord, OrderStatus,
    ProductId,
};
use sqlx::{
    PgConnection, PgPool, Postgres, Row,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    AggregateId, OrderQuery, OrderSummary, OutboxId, OutboxMessage, Page, Result, StoreError,
    Version,
    store::{
        Database, OrderItemStore, OrderQueries, OrderStore, OutboxRelay, OutboxStore, Transaction,
    },
};

const ORDER_COLUMNS: &str = "id, order_number, client_name, status, created_at, updated_at, \
     closed_at, deleted_at, total_cents, version";

/// PostgreSQL-backed order database.
#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    /// Creates a new PostgreSQL database handle.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of at most `max_connections` to `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// An open PostgreSQL transaction.
///
/// `sqlx` rolls the transaction back when this value is dropped uncommitted.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::CorruptRecord(format!("{what}: {detail}"))
}

/// Maps unique violations onto `DuplicateKey`, everything else onto `Database`.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
        && let Some(constraint) = db_err.constraint()
    {
        return StoreError::DuplicateKey {
            constraint: constraint.to_string(),
        };
    }
    StoreError::Database(err)
}

fn row_to_item(row: &PgRow) -> Result<OrderItem> {
    let product_id: String = row.try_get("product_id")?;
    let quantity: i32 = row.try_get("quantity")?;

    Ok(OrderItem::restore(
        OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        ProductId::parse(&product_id).map_err(|e| corrupt("order_items.product_id", e))?,
        row.try_get("description")?,
        Money::from_cents(row.try_get("unit_price_cents")?),
        u32::try_from(quantity).map_err(|e| corrupt("order_items.quantity", e))?,
    ))
}

fn row_number(row: &PgRow) -> Result<OrderNumber> {
    let number: String = row.try_get("order_number")?;
    OrderNumber::parse(&number).map_err(|e| corrupt("orders.order_number", e))
}

fn row_status(row: &PgRow) -> Result<OrderStatus> {
    let status: String = row.try_get("status")?;
    status.parse().map_err(|e| corrupt("orders.status", e))
}

fn row_to_summary(row: &PgRow) -> Result<OrderSummary> {
    Ok(OrderSummary {
        id: AggregateId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_number: row_number(row)?,
        client_name: row.try_get("client_name")?,
        status: row_status(row)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        closed_at: row.try_get("closed_at")?,
        total: Money::from_cents(row.try_get("total_cents")?),
    })
}

/// Loads a live order and its items over `conn`.
///
/// With `lock` set the order row is held `FOR UPDATE` until the surrounding
/// transaction ends.
async fn fetch_order(
    conn: &mut PgConnection,
    number: &OrderNumber,
    lock: bool,
) -> Result<Option<Order>> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1 AND deleted_at IS NULL{}",
        if lock { " FOR UPDATE" } else { "" }
    );

    let Some(row) = sqlx::query(&sql)
        .bind(number.as_str())
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let id: Uuid = row.try_get("id")?;
    let item_rows = sqlx::query(
        r#"
        SELECT id, product_id, description, unit_price_cents, quantity
        FROM order_items
        WHERE order_id = $1
        ORDER BY seq ASC
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let items = item_rows
        .iter()
        .map(row_to_item)
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(Order::restore(OrderRecord {
        id: AggregateId::from_uuid(id),
        number: row_number(&row)?,
        client_name: row.try_get("client_name")?,
        status: row_status(&row)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        closed_at: row.try_get("closed_at")?,
        deleted_at: row.try_get("deleted_at")?,
        items,
        version: Version::new(row.try_get("version")?),
    })))
}

#[async_trait]
impl Database for PostgresDatabase {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> Result<Self::Tx> {
        Ok(PostgresTransaction {
            tx: self.pool.begin().await?,
        })
    }
}

#[async_trait]
impl OrderStore for PostgresTransaction {
    #[tracing::instrument(skip(self), fields(order_number = %number))]
    async fn find_by_number(&mut self, number: &OrderNumber) -> Result<Option<Order>> {
        fetch_order(&mut self.tx, number, true).await
    }

    #[tracing::instrument(skip(self, order), fields(order_number = %order.number()))]
    async fn insert_order(&mut self, order: &Order) -> Result<Version> {
        let version = Version::first();

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, client_name, status, created_at, updated_at,
                                closed_at, deleted_at, total_cents, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.number().as_str())
        .bind(order.client_name())
        .bind(order.status().as_str())
        .bind(order.created_at())
        .bind(order.updated_at())
        .bind(order.closed_at())
        .bind(order.deleted_at())
        .bind(order.total().cents())
        .bind(version.as_i64())
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        Ok(version)
    }

    #[tracing::instrument(skip(self, order), fields(order_number = %order.number(), version = %order.version()))]
    async fn update_order(&mut self, order: &Order) -> Result<Version> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET client_name = $2,
                status = $3,
                updated_at = $4,
                closed_at = $5,
                deleted_at = $6,
                total_cents = $7,
                version = version + 1
            WHERE id = $1 AND version = $8
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.client_name())
        .bind(order.status().as_str())
        .bind(order.updated_at())
        .bind(order.closed_at())
        .bind(order.deleted_at())
        .bind(order.total().cents())
        .bind(order.version().as_i64())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("order version moved or row missing");
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id(),
                expected: order.version(),
            });
        }

        Ok(order.version().next())
    }
}

#[async_trait]
impl OrderItemStore for PostgresTransaction {
    async fn insert_item(&mut self, order_id: AggregateId, item: &OrderItem) -> Result<()> {
        let quantity =
            i32::try_from(item.quantity()).map_err(|e| corrupt("order_items.quantity", e))?;

        sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, product_id, description, unit_price_cents, quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(item.id().as_uuid())
        .bind(order_id.as_uuid())
        .bind(item.product_id().as_str())
        .bind(item.description())
        .bind(item.unit_price().cents())
        .bind(quantity)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            // A missing parent row surfaces as a foreign key violation
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return StoreError::OrderNotFound(order_id);
            }
            map_write_error(e)
        })?;

        Ok(())
    }

    async fn update_item_quantity(&mut self, item: &OrderItem) -> Result<()> {
        let quantity =
            i32::try_from(item.quantity()).map_err(|e| corrupt("order_items.quantity", e))?;

        let result = sqlx::query("UPDATE order_items SET quantity = $2 WHERE id = $1")
            .bind(item.id().as_uuid())
            .bind(quantity)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ItemNotFound(item.id()));
        }
        Ok(())
    }

    async fn delete_item(&mut self, item_id: OrderItemId) -> Result<()> {
        let result = sqlx::query("DELETE FROM order_items WHERE id = $1")
            .bind(item_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ItemNotFound(item_id));
        }
        Ok(())
    }
}

#[async_trait]
impl OutboxStore for PostgresTransaction {
    async fn insert_message(&mut self, message: &OutboxMessage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO outbox_messages (id, occurred_on, type, payload, processed, processed_on)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(message.occurred_on)
        .bind(&message.message_type)
        .bind(&message.payload)
        .bind(message.processed)
        .bind(message.processed_on)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl OrderQueries for PostgresDatabase {
    async fn get_by_number(&self, number: &OrderNumber) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, number, false).await
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<OrderSummary>> {
        let status = query.status.map(|s| s.as_str());
        let limit = i64::try_from(query.page.limit()).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.page.offset()).unwrap_or(i64::MAX);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM orders
            WHERE deleted_at IS NULL AND ($1::text IS NULL OR status = $1)
            "#,
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, order_number, client_name, status, created_at, updated_at, closed_at, total_cents
            FROM orders
            WHERE deleted_at IS NULL AND ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(row_to_summary)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(
            items,
            query.page,
            u64::try_from(total).unwrap_or_default(),
        ))
    }
}

#[async_trait]
impl OutboxRelay for PostgresDatabase {
    async fn fetch_unprocessed(&self, limit: usize) -> Result<Vec<OutboxMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, occurred_on, type, payload, processed, processed_on
            FROM outbox_messages
            WHERE processed = FALSE
            ORDER BY seq ASC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(OutboxMessage {
                    id: OutboxId::from_uuid(row.try_get::<Uuid, _>("id")?),
                    occurred_on: row.try_get("occurred_on")?,
                    message_type: row.try_get("type")?,
                    payload: row.try_get("payload")?,
                    processed: row.try_get("processed")?,
                    processed_on: row.try_get::<Option<DateTime<Utc>>, _>("processed_on")?,
                })
            })
            .collect()
    }

    async fn mark_processed(&self, ids: &[OutboxId], at: DateTime<Utc>) -> Result<u64> {
        let ids: Vec<Uuid> = ids.iter().map(OutboxId::as_uuid).collect();

        let result = sqlx::query(
            r#"
            UPDATE outbox_messages
            SET processed = TRUE, processed_on = $2
            WHERE id = ANY($1) AND processed = FALSE
            "#,
        )
        .bind(ids)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
