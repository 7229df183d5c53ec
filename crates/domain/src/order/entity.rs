//! The order entity.

use chrono::{DateTime, Utc};
use common::{OrderId, Sku};
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderStatus};

/// Longest SKU an order may reference.
pub const MAX_SKU_LEN: usize = 50;

/// Largest quantity a single order may hold.
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// Checks that a quantity is within `1..=MAX_QUANTITY`.
pub fn validate_quantity(quantity: u32) -> Result<(), OrderError> {
    if quantity == 0 || quantity > MAX_QUANTITY {
        return Err(OrderError::InvalidQuantity {
            quantity: i64::from(quantity),
        });
    }
    Ok(())
}

/// An order that has not been persisted yet.
///
/// Only built after its stock has been reserved; the repository assigns the
/// identity when it is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub sku: Sku,
    pub quantity: u32,
}

impl NewOrder {
    /// Validates the SKU and quantity of a new order.
    pub fn new(sku: Sku, quantity: u32) -> Result<Self, OrderError> {
        if sku.is_blank() {
            return Err(OrderError::SkuRequired);
        }
        let length = sku.as_str().chars().count();
        if length > MAX_SKU_LEN {
            return Err(OrderError::SkuTooLong { length });
        }
        validate_quantity(quantity)?;
        Ok(Self { sku, quantity })
    }

    /// Materializes the order under a repository-assigned identity.
    pub fn into_order(self, id: OrderId, now: DateTime<Utc>) -> Order {
        Order {
            id,
            sku: self.sku,
            quantity: self.quantity,
            status: OrderStatus::Created,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    sku: Sku,
    quantity: u32,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Rebuilds an order from stored fields.
    pub fn restore(
        id: OrderId,
        sku: Sku,
        quantity: u32,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sku,
            quantity,
            status,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Fails with `OrderError::Canceled` if the order is terminal.
    pub fn ensure_mutable(&self) -> Result<(), OrderError> {
        self.status.ensure_mutable(self.id)
    }

    /// Changes the ordered quantity.
    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), OrderError> {
        self.ensure_mutable()?;
        validate_quantity(quantity)?;
        self.quantity = quantity;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Moves the order to `Canceled`.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.ensure_mutable()?;
        self.status = OrderStatus::Canceled;
        self.updated_at = Utc::now();
        Ok(())
    }
}
