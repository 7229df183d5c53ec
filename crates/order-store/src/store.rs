use async_trait::async_trait;
use domain::{NewOrder, Order};
use uuid::Uuid;

use crate::{CompensationRecord, OrderId, Result};

/// Key-addressed persistence for orders.
///
/// Individual row writes are serialized by the implementation; sequences of
/// writes across rows are not. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists a new order and returns it with its assigned identity.
    async fn insert(&self, order: NewOrder) -> Result<Order>;

    /// Loads an order by ID.
    async fn find(&self, id: OrderId) -> Result<Option<Order>>;

    /// Overwrites an existing order.
    ///
    /// Fails with `OrderNotFound` if no row exists for the order's ID.
    async fn save(&self, order: &Order) -> Result<()>;

    /// Returns all orders, canceled ones included, ordered by ID.
    async fn list(&self) -> Result<Vec<Order>>;
}

/// Durable log of compensating stock releases.
#[async_trait]
pub trait CompensationLog: Send + Sync {
    /// Stores a new record.
    async fn record(&self, record: &CompensationRecord) -> Result<()>;

    /// Overwrites the status fields of an existing record.
    async fn update(&self, record: &CompensationRecord) -> Result<()>;

    /// Loads a record by ID.
    async fn find_compensation(&self, id: Uuid) -> Result<Option<CompensationRecord>>;

    /// Returns all records that are not completed, oldest first.
    async fn unresolved(&self) -> Result<Vec<CompensationRecord>>;

    /// Returns every record written for an order, oldest first.
    async fn for_order(&self, order_id: OrderId) -> Result<Vec<CompensationRecord>>;
}
