//! Domain layer for the order fulfillment services.
//!
//! This crate provides:
//! - The `Order` entity and its `OrderStatus` lifecycle
//! - A single mutation guard consulted by every state-changing operation
//! - The `StockDelta` value object exchanged between the order workflow and
//!   the stock coordinator

pub mod order;

pub use order::{
    MAX_QUANTITY, MAX_SKU_LEN, NewOrder, Order, OrderError, OrderStatus, StockDelta,
    validate_quantity,
};
