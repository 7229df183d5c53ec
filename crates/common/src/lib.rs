//! Shared types for the order fulfillment services.

pub mod context;
pub mod types;

pub use context::{Principal, RequestContext};
pub use types::{OrderId, Sku};
