use async_trait::async_trait;
use chrono::Utc;
use domain::{NewOrder, Order, OrderStatus};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CompensationLog, CompensationReason, CompensationRecord, CompensationStatus, OrderId,
    OrderRepository, Result, Sku, StoreError,
};

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown order status '{status}'")))?;

        Ok(Order::restore(
            OrderId::new(row.try_get("id")?),
            Sku::new(row.try_get::<String, _>("sku")?),
            to_quantity(row.try_get("quantity")?)?,
            status,
            row.try_get("created_at")?,
            row.try_get("updated_at")?,
        ))
    }

    fn row_to_compensation(row: PgRow) -> Result<CompensationRecord> {
        let reason: String = row.try_get("reason")?;
        let status: String = row.try_get("status")?;
        let attempts: i32 = row.try_get("attempts")?;

        Ok(CompensationRecord {
            id: row.try_get("id")?,
            order_id: OrderId::new(row.try_get("order_id")?),
            sku: Sku::new(row.try_get::<String, _>("sku")?),
            quantity: to_quantity(row.try_get("quantity")?)?,
            order_quantity: to_quantity(row.try_get("order_quantity")?)?,
            reason: CompensationReason::parse(&reason).ok_or_else(|| {
                StoreError::Corrupt(format!("unknown compensation reason '{reason}'"))
            })?,
            status: CompensationStatus::parse(&status).ok_or_else(|| {
                StoreError::Corrupt(format!("unknown compensation status '{status}'"))
            })?,
            attempts: u32::try_from(attempts)
                .map_err(|_| StoreError::Corrupt(format!("negative attempts {attempts}")))?,
            last_error: row.try_get("last_error")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn to_quantity(raw: i32) -> Result<u32> {
    u32::try_from(raw).map_err(|_| StoreError::Corrupt(format!("negative quantity {raw}")))
}

fn to_column(quantity: u32) -> Result<i32> {
    i32::try_from(quantity)
        .map_err(|_| StoreError::Corrupt(format!("quantity {quantity} exceeds column range")))
}

#[async_trait]
impl OrderRepository for PostgresOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order> {
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO orders (sku, quantity, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, sku, quantity, status, created_at, updated_at
            "#,
        )
        .bind(order.sku.as_str())
        .bind(to_column(order.quantity)?)
        .bind(OrderStatus::Created.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let order = Self::row_to_order(row)?;
        tracing::debug!(order_id = %order.id(), sku = %order.sku(), "order row inserted");
        Ok(order)
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, sku, quantity, status, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn save(&self, order: &Order) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET sku = $2, quantity = $3, status = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(order.id().as_i64())
        .bind(order.sku().as_str())
        .bind(to_column(order.quantity())?)
        .bind(order.status().as_str())
        .bind(order.updated_at())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(order.id()));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sku, quantity, status, created_at, updated_at
            FROM orders
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}

#[async_trait]
impl CompensationLog for PostgresOrderStore {
    async fn record(&self, record: &CompensationRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO compensations
                (id, order_id, sku, quantity, order_quantity, reason, status, attempts, last_error,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id)
        .bind(record.order_id.as_i64())
        .bind(record.sku.as_str())
        .bind(to_column(record.quantity)?)
        .bind(to_column(record.order_quantity)?)
        .bind(record.reason.as_str())
        .bind(record.status.as_str())
        .bind(i32::try_from(record.attempts).unwrap_or(i32::MAX))
        .bind(record.last_error.as_deref())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("compensations_pkey")
            {
                return StoreError::DuplicateCompensation(record.id);
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn update(&self, record: &CompensationRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE compensations
            SET status = $2, attempts = $3, last_error = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(record.status.as_str())
        .bind(i32::try_from(record.attempts).unwrap_or(i32::MAX))
        .bind(record.last_error.as_deref())
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::CompensationNotFound(record.id));
        }
        Ok(())
    }

    async fn find_compensation(&self, id: Uuid) -> Result<Option<CompensationRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_id, sku, quantity, order_quantity, reason, status, attempts, last_error,
                   created_at, updated_at
            FROM compensations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_compensation).transpose()
    }

    async fn unresolved(&self) -> Result<Vec<CompensationRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, sku, quantity, order_quantity, reason, status, attempts, last_error,
                   created_at, updated_at
            FROM compensations
            WHERE status <> 'COMPLETED'
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_compensation).collect()
    }

    async fn for_order(&self, order_id: OrderId) -> Result<Vec<CompensationRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, sku, quantity, order_quantity, reason, status, attempts, last_error,
                   created_at, updated_at
            FROM compensations
            WHERE order_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_compensation).collect()
    }
}
