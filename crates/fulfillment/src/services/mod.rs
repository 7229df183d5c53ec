//! Inventory service contract, clients, and retry settings.

pub mod http;
pub mod inventory;
pub mod retry;

pub use http::HttpInventoryClient;
pub use inventory::{InMemoryInventoryService, InventoryAuthority, InventoryError, Product};
pub use retry::RetryPolicy;
