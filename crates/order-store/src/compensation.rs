//! Compensating-action records.
//!
//! A record is written before a stock release is attempted so that a release
//! which fails leaves an auditable, retryable trace instead of only a log line.

use chrono::{DateTime, Utc};
use common::{OrderId, Sku};
use domain::Order;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why stock is being returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompensationReason {
    /// The whole order was canceled.
    Cancel,
    /// The order quantity was lowered.
    Decrease,
}

impl CompensationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompensationReason::Cancel => "CANCEL",
            CompensationReason::Decrease => "DECREASE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CANCEL" => Some(CompensationReason::Cancel),
            "DECREASE" => Some(CompensationReason::Decrease),
            _ => None,
        }
    }
}

impl std::fmt::Display for CompensationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a compensating release.
///
/// ```text
/// Pending ──┬──► Released ──► Completed
///           └──► Failed ──► Released
/// ```
///
/// `Released` means the inventory confirmed the release but the order has
/// not been updated to match yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompensationStatus {
    /// Recorded, release not yet confirmed.
    #[default]
    Pending,
    /// Stock was restored; the order change is still outstanding.
    Released,
    /// Stock was restored and the order updated.
    Completed,
    /// Release failed; inventory and orders have diverged.
    Failed,
}

impl CompensationStatus {
    /// Returns true if the release still has to happen.
    pub fn is_unresolved(&self) -> bool {
        !matches!(self, CompensationStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompensationStatus::Pending => "PENDING",
            CompensationStatus::Released => "RELEASED",
            CompensationStatus::Completed => "COMPLETED",
            CompensationStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(CompensationStatus::Pending),
            "RELEASED" => Some(CompensationStatus::Released),
            "COMPLETED" => Some(CompensationStatus::Completed),
            "FAILED" => Some(CompensationStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for CompensationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stock release owed to the inventory service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationRecord {
    pub id: Uuid,
    pub order_id: OrderId,
    pub sku: Sku,
    /// Units to give back.
    pub quantity: u32,
    /// Order quantity when the record was written.
    pub order_quantity: u32,
    pub reason: CompensationReason,
    pub status: CompensationStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompensationRecord {
    /// Creates a pending record for a release about to be attempted on `order`.
    pub fn pending(order: &Order, quantity: u32, reason: CompensationReason) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id: order.id(),
            sku: order.sku().clone(),
            quantity,
            order_quantity: order.quantity(),
            reason,
            status: CompensationStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Order quantity once the change this record belongs to is applied.
    ///
    /// A cancel keeps the quantity; `None` if a decrease would leave nothing.
    pub fn order_quantity_after(&self) -> Option<u32> {
        match self.reason {
            CompensationReason::Cancel => Some(self.order_quantity),
            CompensationReason::Decrease => self
                .order_quantity
                .checked_sub(self.quantity)
                .filter(|q| *q > 0),
        }
    }

    /// The inventory confirmed the release.
    pub fn mark_released(&mut self) {
        self.attempts += 1;
        self.status = CompensationStatus::Released;
        self.last_error = None;
        self.updated_at = Utc::now();
    }

    /// The order now reflects the release.
    pub fn mark_completed(&mut self) {
        self.status = CompensationStatus::Completed;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.attempts += 1;
        self.status = CompensationStatus::Failed;
        self.last_error = Some(error.into());
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::NewOrder;

    fn order(quantity: u32) -> Order {
        NewOrder::new(Sku::new("SKU-001"), quantity)
            .unwrap()
            .into_order(OrderId::new(1), Utc::now())
    }

    fn record() -> CompensationRecord {
        CompensationRecord::pending(&order(5), 5, CompensationReason::Cancel)
    }

    #[test]
    fn test_pending_record_defaults() {
        let r = record();
        assert_eq!(r.status, CompensationStatus::Pending);
        assert_eq!(r.attempts, 0);
        assert!(r.last_error.is_none());
        assert!(r.status.is_unresolved());
    }

    #[test]
    fn test_failure_release_then_completion() {
        let mut r = record();
        r.mark_failed("connection refused");
        assert_eq!(r.status, CompensationStatus::Failed);
        assert_eq!(r.attempts, 1);
        assert_eq!(r.last_error.as_deref(), Some("connection refused"));
        assert!(r.status.is_unresolved());

        r.mark_released();
        assert_eq!(r.status, CompensationStatus::Released);
        assert_eq!(r.attempts, 2);
        assert!(r.last_error.is_none());
        assert!(r.status.is_unresolved());

        r.mark_completed();
        assert_eq!(r.status, CompensationStatus::Completed);
        assert_eq!(r.attempts, 2);
        assert!(!r.status.is_unresolved());
    }

    #[test]
    fn test_order_quantity_after() {
        let order = order(5);
        assert_eq!(record().order_quantity_after(), Some(5));
        assert_eq!(
            CompensationRecord::pending(&order, 3, CompensationReason::Decrease)
                .order_quantity_after(),
            Some(2)
        );
        assert_eq!(
            CompensationRecord::pending(&order, 5, CompensationReason::Decrease)
                .order_quantity_after(),
            None
        );
    }

    #[test]
    fn test_status_and_reason_names_parse_back() {
        for s in [
            CompensationStatus::Pending,
            CompensationStatus::Released,
            CompensationStatus::Completed,
            CompensationStatus::Failed,
        ] {
            assert_eq!(CompensationStatus::parse(s.as_str()), Some(s));
        }
        for r in [CompensationReason::Cancel, CompensationReason::Decrease] {
            assert_eq!(CompensationReason::parse(r.as_str()), Some(r));
        }
        assert_eq!(CompensationStatus::parse("UNKNOWN"), None);
    }
}
