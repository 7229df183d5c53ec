//! Order fulfillment against a remote inventory service.
//!
//! Stock lives in the inventory service; this crate owns orders. Every use
//! case adjusts stock first and persists the order only after the inventory
//! confirmed the change:
//! 1. Create: reserve stock, then insert the order
//! 2. Update quantity: reserve or release the difference, then save
//! 3. Cancel: release the full quantity, then mark the order canceled
//!
//! Releases are recorded before they run. A release that fails is a
//! compensation incident and surfaces as a fatal error that is never
//! reported to callers as a plain business failure.

pub mod coordinator;
pub mod error;
pub mod services;
pub mod workflow;

pub use coordinator::{DEFAULT_CONFLICT_RETRIES, StockCoordinator};
pub use error::{FulfillmentError, Result, Severity};
pub use services::{
    HttpInventoryClient, InMemoryInventoryService, InventoryAuthority, InventoryError, Product,
    RetryPolicy,
};
pub use workflow::OrderWorkflow;
