//! Order entity and related types.

mod entity;
mod state;
mod value_objects;

pub use entity::{MAX_QUANTITY, MAX_SKU_LEN, NewOrder, Order, validate_quantity};
pub use state::OrderStatus;
pub use value_objects::StockDelta;

use common::OrderId;
use thiserror::Error;

/// Errors raised by the order entity itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The order is canceled and accepts no further mutation.
    #[error("Order {0} is canceled")]
    Canceled(OrderId),

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be between 1 and {max})", max = MAX_QUANTITY)]
    InvalidQuantity { quantity: i64 },

    /// SKU is required.
    #[error("SKU is required")]
    SkuRequired,

    /// SKU does not fit the order record.
    #[error("SKU is too long: {length} characters (at most {max})", max = MAX_SKU_LEN)]
    SkuTooLong { length: usize },
}
