//! Stock coordinator: single stock adjustments against the inventory service.

use common::{RequestContext, Sku};
use domain::StockDelta;

use crate::error::{FulfillmentError, Result};
use crate::services::inventory::{InventoryAuthority, InventoryError, Product};

/// Default number of extra fetch-then-write rounds a release makes after a
/// version conflict.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 3;

/// Performs one stock adjustment per call as a fetch-then-write round trip.
///
/// Operations are never batched or reordered, and nothing serializes
/// concurrent callers working on the same SKU. When the inventory service
/// hands out product versions, a write based on a stale read is refused
/// instead of silently overwriting a concurrent change.
pub struct StockCoordinator<I: InventoryAuthority> {
    inventory: I,
    conflict_retries: u32,
}

impl<I: InventoryAuthority> StockCoordinator<I> {
    /// Creates a new stock coordinator.
    pub fn new(inventory: I) -> Self {
        Self {
            inventory,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    /// Sets how many times a release re-reads and rewrites after a conflict.
    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    /// Returns the underlying inventory client.
    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// Fetches the current product record.
    pub async fn fetch(&self, ctx: &RequestContext, sku: &Sku) -> Result<Product> {
        self.inventory
            .get_product(ctx, sku)
            .await
            .map_err(|e| {
                tracing::error!(%sku, error = %e, "inventory lookup failed");
                FulfillmentError::from(e)
            })?
            .ok_or_else(|| FulfillmentError::ProductNotFound(sku.clone()))
    }

    /// Fresh read of a product that is still on sale.
    pub async fn fetch_active(&self, ctx: &RequestContext, sku: &Sku) -> Result<Product> {
        let product = self.fetch(ctx, sku).await?;
        if !product.active {
            return Err(FulfillmentError::ProductNotAvailable(product.sku));
        }
        Ok(product)
    }

    /// Fresh read confirming the product is active and holds `requested` units.
    pub async fn check_available(
        &self,
        ctx: &RequestContext,
        sku: &Sku,
        requested: u32,
    ) -> Result<Product> {
        let product = self.fetch_active(ctx, sku).await?;
        ensure_reservable(&product, requested)?;
        Ok(product)
    }

    /// Consumes `quantity` units of stock.
    #[tracing::instrument(skip(self, ctx), fields(sku = %sku))]
    pub async fn reserve(
        &self,
        ctx: &RequestContext,
        sku: &Sku,
        quantity: u32,
    ) -> Result<Product> {
        ensure_positive(quantity)?;
        let product = self.check_available(ctx, sku, quantity).await?;
        self.reserve_from(ctx, product, quantity).await
    }

    /// Write half of a reservation, based on a product read by the caller.
    ///
    /// Never retried: a repeated write could consume the stock twice.
    pub async fn reserve_from(
        &self,
        ctx: &RequestContext,
        product: Product,
        quantity: u32,
    ) -> Result<Product> {
        ensure_positive(quantity)?;
        ensure_reservable(&product, quantity)?;

        let remaining = product.quantity - quantity;
        let updated = match self
            .inventory
            .update_product(ctx, &product.with_quantity(remaining))
            .await
        {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                tracing::warn!(sku = %product.sku, "inventory did not confirm reservation");
                return Err(FulfillmentError::ProductNotAvailable(product.sku));
            }
            Err(e) => {
                tracing::error!(sku = %product.sku, error = %e, "stock reservation failed");
                return Err(e.into());
            }
        };

        metrics::counter!("stock_reservations_total").increment(1);
        tracing::debug!(
            sku = %updated.sku,
            reserved = quantity,
            remaining = updated.quantity,
            "stock reserved"
        );
        Ok(updated)
    }

    /// Returns `quantity` units of stock.
    ///
    /// The fetch is not swallowed: an unknown SKU or an unreachable service is
    /// returned to the caller, which treats any release failure as a
    /// compensation incident. A version conflict means the write did not
    /// apply, so the round trip is repeated up to the configured limit.
    #[tracing::instrument(skip(self, ctx), fields(sku = %sku))]
    pub async fn release(
        &self,
        ctx: &RequestContext,
        sku: &Sku,
        quantity: u32,
    ) -> Result<Product> {
        ensure_positive(quantity)?;

        let mut conflicts = 0;
        loop {
            let product = self.fetch(ctx, sku).await?;
            let restored = product.quantity.checked_add(quantity).ok_or_else(|| {
                FulfillmentError::InventoryCommunication(format!(
                    "stock for {sku} would overflow on release of {quantity}"
                ))
            })?;

            match self
                .inventory
                .update_product(ctx, &product.with_quantity(restored))
                .await
            {
                Ok(Some(updated)) => {
                    metrics::counter!("stock_releases_total").increment(1);
                    tracing::info!(
                        %sku,
                        released = quantity,
                        stock = updated.quantity,
                        "stock restored"
                    );
                    return Ok(updated);
                }
                Ok(None) => {
                    tracing::error!(%sku, "inventory did not confirm stock release");
                    return Err(FulfillmentError::ProductNotAvailable(sku.clone()));
                }
                Err(InventoryError::Conflict(_)) if conflicts < self.conflict_retries => {
                    conflicts += 1;
                    tracing::warn!(%sku, attempt = conflicts, "stock changed during release, re-reading");
                }
                Err(e) => {
                    tracing::error!(%sku, error = %e, "stock release failed");
                    return Err(e.into());
                }
            }
        }
    }

    /// Applies a signed delta: positive reserves, negative releases, zero does nothing.
    pub async fn apply(
        &self,
        ctx: &RequestContext,
        sku: &Sku,
        delta: StockDelta,
    ) -> Result<Option<Product>> {
        if let Some(quantity) = delta.reserved() {
            return self.reserve(ctx, sku, quantity).await.map(Some);
        }
        if let Some(quantity) = delta.released() {
            return self.release(ctx, sku, quantity).await.map(Some);
        }
        Ok(None)
    }
}

fn ensure_positive(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(FulfillmentError::InvalidOrder(
            domain::OrderError::InvalidQuantity { quantity: 0 },
        ));
    }
    Ok(())
}

fn ensure_reservable(product: &Product, requested: u32) -> Result<()> {
    if !product.active {
        return Err(FulfillmentError::ProductNotAvailable(product.sku.clone()));
    }
    if product.quantity < requested {
        return Err(FulfillmentError::InsufficientStock {
            available: product.quantity,
            requested,
        });
    }
    Ok(())
}
