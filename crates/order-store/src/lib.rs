pub mod compensation;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{OrderId, Sku};
pub use compensation::{CompensationReason, CompensationRecord, CompensationStatus};
pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::{CompensationLog, OrderRepository};
