use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domain::{NewOrder, Order};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    CompensationLog, CompensationRecord, OrderId, OrderRepository, Result, StoreError,
};

#[derive(Debug, Default)]
struct InMemoryState {
    orders: BTreeMap<OrderId, Order>,
    compensations: HashMap<Uuid, CompensationRecord>,
    next_id: i64,
    fail_on_insert: bool,
    fail_on_save: bool,
    fail_on_compensation_update: bool,
}

/// In-memory order store for testing and single-process deployments.
///
/// This implementation keeps orders and compensation records in memory and
/// provides the same interface as the PostgreSQL implementation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to reject subsequent inserts.
    pub async fn set_fail_on_insert(&self, fail: bool) {
        self.state.write().await.fail_on_insert = fail;
    }

    /// Configures the store to reject subsequent saves of existing orders.
    pub async fn set_fail_on_save(&self, fail: bool) {
        self.state.write().await.fail_on_save = fail;
    }

    /// Configures the store to reject subsequent compensation record updates.
    pub async fn set_fail_on_compensation_update(&self, fail: bool) {
        self.state.write().await.fail_on_compensation_update = fail;
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the number of stored compensation records.
    pub async fn compensation_count(&self) -> usize {
        self.state.read().await.compensations.len()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order> {
        let mut state = self.state.write().await;
        if state.fail_on_insert {
            return Err(StoreError::Unavailable("insert rejected".to_string()));
        }

        state.next_id += 1;
        let id = OrderId::new(state.next_id);
        let order = order.into_order(id, Utc::now());
        state.orders.insert(id, order.clone());

        Ok(order)
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn save(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_save {
            return Err(StoreError::Unavailable("save rejected".to_string()));
        }

        match state.orders.get_mut(&order.id()) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(StoreError::OrderNotFound(order.id())),
        }
    }

    async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.state.read().await.orders.values().cloned().collect())
    }
}

#[async_trait]
impl CompensationLog for InMemoryOrderStore {
    async fn record(&self, record: &CompensationRecord) -> Result<()> {
        let mut state = self.state.write().await;
        if state.compensations.contains_key(&record.id) {
            return Err(StoreError::DuplicateCompensation(record.id));
        }
        state.compensations.insert(record.id, record.clone());
        Ok(())
    }

    async fn update(&self, record: &CompensationRecord) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_compensation_update {
            return Err(StoreError::Unavailable("compensation update rejected".to_string()));
        }
        match state.compensations.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::CompensationNotFound(record.id)),
        }
    }

    async fn find_compensation(&self, id: Uuid) -> Result<Option<CompensationRecord>> {
        Ok(self.state.read().await.compensations.get(&id).cloned())
    }

    async fn unresolved(&self) -> Result<Vec<CompensationRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<_> = state
            .compensations
            .values()
            .filter(|r| r.status.is_unresolved())
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn for_order(&self, order_id: OrderId) -> Result<Vec<CompensationRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<_> = state
            .compensations
            .values()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}
