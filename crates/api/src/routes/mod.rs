pub mod compensations;
pub mod health;
pub mod metrics;
pub mod orders;
