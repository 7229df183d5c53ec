//! Inventory service contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use common::{RequestContext, Sku};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Product record as exchanged with the inventory service.
///
/// The order side only ever holds a transient copy fetched for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub sku: Sku,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub active: bool,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub category: Option<String>,
    /// Units in stock.
    pub quantity: u32,
    /// Concurrency token; writes carrying a stale version are refused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl Product {
    /// Creates an active product with the given stock.
    pub fn new(sku: impl Into<Sku>, quantity: u32) -> Self {
        let sku = sku.into();
        Self {
            name: sku.to_string(),
            sku,
            description: None,
            active: true,
            price: 0.0,
            category: None,
            quantity,
            version: None,
        }
    }

    /// Marks the product inactive.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Attaches a concurrency token.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Copy of the full record with a new stock count.
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }
}

/// Failures reported by an inventory service client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// The record changed since it was read; the write was not applied.
    #[error("Product {0} was modified concurrently")]
    Conflict(Sku),

    /// The service refused the write.
    #[error("Inventory rejected update of {sku} (status {status})")]
    Rejected { sku: Sku, status: u16 },

    /// Transport failure, timeout, or unexpected response.
    #[error("{0}")]
    Communication(String),
}

/// Read/write access to product stock owned by the inventory service.
///
/// Both operations forward the caller's `Authorization` header from `ctx`.
#[async_trait]
pub trait InventoryAuthority: Send + Sync {
    /// Fetches a product. Returns `None` if the SKU is unknown.
    async fn get_product(
        &self,
        ctx: &RequestContext,
        sku: &Sku,
    ) -> Result<Option<Product>, InventoryError>;

    /// Writes the full product record back.
    ///
    /// Returns `None` if the service did not confirm the update.
    async fn update_product(
        &self,
        ctx: &RequestContext,
        product: &Product,
    ) -> Result<Option<Product>, InventoryError>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    products: HashMap<Sku, Product>,
    fail_on_get: bool,
    fail_on_update: bool,
    reject_updates: bool,
    forced_conflicts: u32,
    get_calls: usize,
    update_calls: usize,
    last_authorization: Option<String>,
}

/// In-memory inventory service for testing.
///
/// Versioned products get their version bumped on every accepted write and
/// refuse writes carrying a different version.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<Mutex<InMemoryInventoryState>>,
}

impl InMemoryInventoryService {
    /// Creates a new in-memory inventory service.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryInventoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces a product.
    pub fn put_product(&self, product: Product) {
        self.lock().products.insert(product.sku.clone(), product);
    }

    /// Returns the stored product, if any.
    pub fn product(&self, sku: &str) -> Option<Product> {
        self.lock().products.get(&Sku::new(sku)).cloned()
    }

    /// Returns the stock count for a SKU.
    pub fn stock(&self, sku: &str) -> Option<u32> {
        self.product(sku).map(|p| p.quantity)
    }

    /// Makes reads fail with a communication error.
    pub fn set_fail_on_get(&self, fail: bool) {
        self.lock().fail_on_get = fail;
    }

    /// Makes writes fail with a communication error.
    pub fn set_fail_on_update(&self, fail: bool) {
        self.lock().fail_on_update = fail;
    }

    /// Makes writes return without confirming the update.
    pub fn set_reject_updates(&self, reject: bool) {
        self.lock().reject_updates = reject;
    }

    /// Refuses the next `count` writes with a version conflict.
    pub fn force_conflicts(&self, count: u32) {
        self.lock().forced_conflicts = count;
    }

    /// Number of `get_product` calls received.
    pub fn get_calls(&self) -> usize {
        self.lock().get_calls
    }

    /// Number of `update_product` calls received.
    pub fn update_calls(&self) -> usize {
        self.lock().update_calls
    }

    /// The `Authorization` value seen on the most recent call.
    pub fn last_authorization(&self) -> Option<String> {
        self.lock().last_authorization.clone()
    }
}

#[async_trait]
impl InventoryAuthority for InMemoryInventoryService {
    async fn get_product(
        &self,
        ctx: &RequestContext,
        sku: &Sku,
    ) -> Result<Option<Product>, InventoryError> {
        let mut state = self.lock();
        state.get_calls += 1;
        state.last_authorization = ctx.authorization().map(String::from);

        if state.fail_on_get {
            return Err(InventoryError::Communication(
                "inventory service unreachable".to_string(),
            ));
        }

        Ok(state.products.get(sku).cloned())
    }

    async fn update_product(
        &self,
        ctx: &RequestContext,
        product: &Product,
    ) -> Result<Option<Product>, InventoryError> {
        let mut state = self.lock();
        state.update_calls += 1;
        state.last_authorization = ctx.authorization().map(String::from);

        if state.fail_on_update {
            return Err(InventoryError::Communication(
                "inventory service unreachable".to_string(),
            ));
        }
        if state.reject_updates {
            return Ok(None);
        }
        if state.forced_conflicts > 0 {
            state.forced_conflicts -= 1;
            return Err(InventoryError::Conflict(product.sku.clone()));
        }

        let Some(stored) = state.products.get_mut(&product.sku) else {
            return Ok(None);
        };

        if stored.version.is_some() && stored.version != product.version {
            return Err(InventoryError::Conflict(product.sku.clone()));
        }

        let next_version = stored.version.map(|v| v + 1);
        *stored = Product {
            version: next_version,
            ..product.clone()
        };

        Ok(Some(stored.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RequestContext {
        RequestContext::anonymous()
    }

    #[tokio::test]
    async fn test_get_and_update() {
        let service = InMemoryInventoryService::new();
        service.put_product(Product::new("SKU-001", 10));

        let product = service
            .get_product(&ctx(), &Sku::new("SKU-001"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.quantity, 10);

        let updated = service
            .update_product(&ctx(), &product.with_quantity(7))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.quantity, 7);
        assert_eq!(service.stock("SKU-001"), Some(7));
        assert_eq!(service.get_calls(), 1);
        assert_eq!(service.update_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_sku() {
        let service = InMemoryInventoryService::new();
        let sku = Sku::new("MISSING");

        assert!(service.get_product(&ctx(), &sku).await.unwrap().is_none());
        assert!(
            service
                .update_product(&ctx(), &Product::new("MISSING", 1))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let service = InMemoryInventoryService::new();
        service.put_product(Product::new("SKU-001", 10).with_version(1));

        let first = service
            .get_product(&ctx(), &Sku::new("SKU-001"))
            .await
            .unwrap()
            .unwrap();
        let stale = first.clone();

        let written = service
            .update_product(&ctx(), &first.with_quantity(8))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(written.version, Some(2));

        let result = service.update_product(&ctx(), &stale.with_quantity(5)).await;
        assert_eq!(result, Err(InventoryError::Conflict(Sku::new("SKU-001"))));
        assert_eq!(service.stock("SKU-001"), Some(8));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let service = InMemoryInventoryService::new();
        service.put_product(Product::new("SKU-001", 10));
        let sku = Sku::new("SKU-001");

        service.set_fail_on_get(true);
        assert!(matches!(
            service.get_product(&ctx(), &sku).await,
            Err(InventoryError::Communication(_))
        ));
        service.set_fail_on_get(false);

        service.set_reject_updates(true);
        let product = service.product("SKU-001").unwrap();
        assert!(
            service
                .update_product(&ctx(), &product.with_quantity(1))
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(service.stock("SKU-001"), Some(10));
    }

    #[tokio::test]
    async fn test_records_forwarded_authorization() {
        let service = InMemoryInventoryService::new();
        let ctx = RequestContext::new(Default::default(), Some("Bearer token-1".to_string()));

        service.get_product(&ctx, &Sku::new("X")).await.unwrap();
        assert_eq!(service.last_authorization().as_deref(), Some("Bearer token-1"));
    }
}
