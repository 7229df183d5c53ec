//! Fulfillment error taxonomy.

use common::{OrderId, Sku};
use domain::OrderError;
use order_store::{CompensationReason, StoreError};
use thiserror::Error;
use uuid::Uuid;

use crate::services::InventoryError;

/// How a failure should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Business rule violation; report to the caller, nothing was mutated.
    Caller,
    /// The caller may repeat the request unchanged.
    Retryable,
    /// A collaborator could not be reached; nothing was mutated.
    Unavailable,
    /// Local orders and remote stock have diverged; needs an operator.
    Fatal,
    /// Unexpected failure of local infrastructure.
    Internal,
}

/// Errors that can occur during order fulfillment.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The inventory service has no product for this SKU.
    #[error("Product not found: {0}")]
    ProductNotFound(Sku),

    /// The product is inactive or the inventory service rejected the write.
    #[error("Product not available: {0}")]
    ProductNotAvailable(Sku),

    /// Not enough stock for the requested reservation.
    #[error("Insufficient stock. Available: {available}, requested: {requested}")]
    InsufficientStock { available: u32, requested: u32 },

    /// The order is canceled and cannot be mutated.
    #[error("Order {0} is canceled")]
    OrderCanceled(OrderId),

    /// The request itself is malformed.
    #[error("Invalid order: {0}")]
    InvalidOrder(OrderError),

    /// The product changed between read and write; nothing was written.
    #[error("Stock for {0} changed concurrently, retry the request")]
    StockConflict(Sku),

    /// The inventory service could not be reached or answered unexpectedly.
    #[error("Inventory service error: {0}")]
    InventoryCommunication(String),

    /// A compensating release failed. Stock and orders are out of sync.
    #[error(
        "Compensation failed for order {order_id} ({reason} {sku} x{quantity}), record {record_id}: {cause}"
    )]
    FatalCompensation {
        record_id: Uuid,
        order_id: OrderId,
        sku: Sku,
        quantity: u32,
        reason: CompensationReason,
        #[source]
        cause: Box<FulfillmentError>,
    },

    /// A stock release succeeded but the local order or its record could not
    /// be updated. The release must not be repeated; finish the record instead.
    #[error("Stock released for order {order_id} but the order was not updated, record {record_id}: {cause}")]
    OrderOutOfSync {
        record_id: Uuid,
        order_id: OrderId,
        #[source]
        cause: Box<FulfillmentError>,
    },

    /// Compensation record not found.
    #[error("Compensation record not found: {0}")]
    CompensationNotFound(Uuid),

    /// The order has an unresolved compensation record; resolve it first.
    #[error("Order {order_id} has an unresolved compensation {record_id}")]
    CompensationOutstanding { order_id: OrderId, record_id: Uuid },

    /// The order no longer matches the state the record was written against.
    #[error("Compensation {record_id} no longer matches order {order_id}")]
    CompensationMismatch { record_id: Uuid, order_id: OrderId },

    /// Order store error.
    #[error("Order store error: {0}")]
    Store(#[from] StoreError),
}

impl FulfillmentError {
    /// Classifies the error for propagation and response mapping.
    pub fn severity(&self) -> Severity {
        match self {
            FulfillmentError::OrderNotFound(_)
            | FulfillmentError::ProductNotFound(_)
            | FulfillmentError::ProductNotAvailable(_)
            | FulfillmentError::InsufficientStock { .. }
            | FulfillmentError::OrderCanceled(_)
            | FulfillmentError::InvalidOrder(_)
            | FulfillmentError::CompensationNotFound(_)
            | FulfillmentError::CompensationOutstanding { .. }
            | FulfillmentError::CompensationMismatch { .. } => Severity::Caller,
            FulfillmentError::StockConflict(_) => Severity::Retryable,
            FulfillmentError::InventoryCommunication(_) => Severity::Unavailable,
            FulfillmentError::FatalCompensation { .. } | FulfillmentError::OrderOutOfSync { .. } => {
                Severity::Fatal
            }
            FulfillmentError::Store(_) => Severity::Internal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// The compensation record an operator should look at, if any.
    pub fn record_id(&self) -> Option<Uuid> {
        match self {
            FulfillmentError::FatalCompensation { record_id, .. }
            | FulfillmentError::OrderOutOfSync { record_id, .. }
            | FulfillmentError::CompensationOutstanding { record_id, .. }
            | FulfillmentError::CompensationMismatch { record_id, .. } => Some(*record_id),
            _ => None,
        }
    }
}

impl From<OrderError> for FulfillmentError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::Canceled(id) => FulfillmentError::OrderCanceled(id),
            other => FulfillmentError::InvalidOrder(other),
        }
    }
}

impl From<InventoryError> for FulfillmentError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::Conflict(sku) => FulfillmentError::StockConflict(sku),
            InventoryError::Rejected { sku, .. } => FulfillmentError::ProductNotAvailable(sku),
            InventoryError::Communication(msg) => FulfillmentError::InventoryCommunication(msg),
        }
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
