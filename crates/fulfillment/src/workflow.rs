//! Order workflow: create, read, update, and cancel orders against remote stock.

use std::time::Instant;

use common::{OrderId, RequestContext, Sku};
use domain::{NewOrder, Order, OrderError, StockDelta, validate_quantity};
use order_store::{
    CompensationLog, CompensationReason, CompensationRecord, CompensationStatus, OrderRepository,
};
use uuid::Uuid;

use crate::coordinator::StockCoordinator;
use crate::error::{FulfillmentError, Result};
use crate::services::inventory::InventoryAuthority;

/// Sequences stock adjustments and order persistence for each use case.
///
/// Stock is always adjusted first and the order row written only after the
/// adjustment succeeded. Releases are preceded by a durable compensation
/// record; a release that fails leaves that record `Failed` and is reported
/// as [`FulfillmentError::FatalCompensation`]. A local write that fails after
/// a confirmed release is reported as [`FulfillmentError::OrderOutOfSync`].
/// An order with an unresolved record accepts no further stock changes.
pub struct OrderWorkflow<R, C, I>
where
    R: OrderRepository,
    C: CompensationLog,
    I: InventoryAuthority,
{
    orders: R,
    compensations: C,
    stock: StockCoordinator<I>,
}

impl<R, C, I> OrderWorkflow<R, C, I>
where
    R: OrderRepository,
    C: CompensationLog,
    I: InventoryAuthority,
{
    /// Creates a new order workflow.
    pub fn new(orders: R, compensations: C, stock: StockCoordinator<I>) -> Self {
        Self {
            orders,
            compensations,
            stock,
        }
    }

    /// Returns the stock coordinator.
    pub fn stock(&self) -> &StockCoordinator<I> {
        &self.stock
    }

    /// Reserves stock and records a new order.
    ///
    /// Any reservation failure aborts before an order row exists. A store
    /// failure after a successful reservation leaves the stock consumed; that
    /// case is logged and counted, not rolled back.
    #[tracing::instrument(skip(self, ctx), fields(user_id = ?ctx.principal().user_id))]
    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        sku: Sku,
        quantity: u32,
    ) -> Result<Order> {
        let started = Instant::now();
        let new_order = NewOrder::new(sku, quantity)?;

        self.stock
            .reserve(ctx, &new_order.sku, new_order.quantity)
            .await?;

        let sku = new_order.sku.clone();
        let order = self.orders.insert(new_order).await.map_err(|e| {
            metrics::counter!("orphaned_reservations_total").increment(1);
            tracing::error!(
                %sku,
                quantity,
                error = %e,
                "order not persisted after stock reservation; stock remains reserved"
            );
            FulfillmentError::from(e)
        })?;

        metrics::counter!("orders_created_total").increment(1);
        record_duration("create", started);
        tracing::info!(order_id = %order.id(), %sku, quantity, "order created");
        Ok(order)
    }

    /// Loads an order.
    pub async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.orders
            .find(id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(id))
    }

    /// Returns all orders, canceled ones included.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.orders.list().await?)
    }

    /// Returns the stock to inventory and marks the order canceled.
    ///
    /// Canceling an already canceled order succeeds without touching stock.
    /// If an earlier cancel released the stock but could not update the
    /// order, only the order change is finished; the stock is not released
    /// again. Any other unresolved compensation blocks the cancel.
    #[tracing::instrument(skip(self, ctx), fields(user_id = ?ctx.principal().user_id))]
    pub async fn cancel_order(&self, ctx: &RequestContext, id: OrderId) -> Result<()> {
        let started = Instant::now();
        let mut order = self.get_order(id).await?;

        if !order.status().can_cancel() {
            tracing::warn!(order_id = %id, "order already canceled");
            return Ok(());
        }

        let record = match self.outstanding(id).await? {
            Some(record)
                if record.status == CompensationStatus::Released
                    && record.reason == CompensationReason::Cancel =>
            {
                tracing::warn!(
                    order_id = %id,
                    record_id = %record.id,
                    "stock already released by an earlier cancel; finishing the order change"
                );
                record
            }
            Some(record) => {
                return Err(FulfillmentError::CompensationOutstanding {
                    order_id: id,
                    record_id: record.id,
                });
            }
            None => {
                self.compensate(ctx, &order, order.quantity(), CompensationReason::Cancel)
                    .await?
            }
        };
        self.finish(record, &mut order).await?;

        metrics::counter!("orders_canceled_total").increment(1);
        record_duration("cancel", started);
        tracing::info!(order_id = %id, sku = %order.sku(), "order canceled and stock restored");
        Ok(())
    }

    /// Moves an order to a new quantity, reserving or releasing the difference.
    ///
    /// Refused while the order has an unresolved compensation record.
    #[tracing::instrument(skip(self, ctx), fields(user_id = ?ctx.principal().user_id))]
    pub async fn update_order_quantity(
        &self,
        ctx: &RequestContext,
        id: OrderId,
        new_quantity: u32,
    ) -> Result<Order> {
        let started = Instant::now();
        let mut order = self.get_order(id).await?;
        order.ensure_mutable()?;
        validate_quantity(new_quantity)?;

        let previous = order.quantity();
        let delta = StockDelta::between(previous, new_quantity);
        if delta.is_zero() {
            tracing::info!(order_id = %id, "quantity unchanged");
            return Ok(order);
        }

        if let Some(record) = self.outstanding(id).await? {
            return Err(FulfillmentError::CompensationOutstanding {
                order_id: id,
                record_id: record.id,
            });
        }

        let sku = order.sku().clone();
        let product = self.stock.fetch_active(ctx, &sku).await?;

        if let Some(extra) = delta.reserved() {
            self.stock.reserve_from(ctx, product, extra).await?;
            order.set_quantity(new_quantity)?;
            self.orders.save(&order).await.map_err(|e| {
                metrics::counter!("orphaned_reservations_total").increment(1);
                tracing::error!(
                    order_id = %id,
                    %sku,
                    reserved = extra,
                    error = %e,
                    "order not persisted after stock reservation; stock remains reserved"
                );
                FulfillmentError::from(e)
            })?;
        } else if let Some(returned) = delta.released() {
            let record = self
                .compensate(ctx, &order, returned, CompensationReason::Decrease)
                .await?;
            self.finish(record, &mut order).await?;
        }

        record_duration("update", started);
        tracing::info!(
            order_id = %id,
            %sku,
            from = previous,
            to = new_quantity,
            %delta,
            "order quantity updated"
        );
        Ok(order)
    }

    /// Compensation records that are not completed, oldest first.
    pub async fn pending_compensations(&self) -> Result<Vec<CompensationRecord>> {
        Ok(self.compensations.unresolved().await?)
    }

    /// Resolves a compensation record and finishes the order change it belongs to.
    ///
    /// A completed record is returned unchanged. A released record only has
    /// its order change applied. A pending or failed record is checked
    /// against its order before anything is released: if the order already
    /// reflects the change the record is closed without a release, and if the
    /// order has moved on since the record was written the retry is refused
    /// with [`FulfillmentError::CompensationMismatch`].
    #[tracing::instrument(skip(self, ctx))]
    pub async fn retry_compensation(
        &self,
        ctx: &RequestContext,
        record_id: Uuid,
    ) -> Result<CompensationRecord> {
        let mut record = self
            .compensations
            .find_compensation(record_id)
            .await?
            .ok_or(FulfillmentError::CompensationNotFound(record_id))?;

        if record.status == CompensationStatus::Completed {
            return Ok(record);
        }

        let mut order = self.get_order(record.order_id).await?;

        if record.status != CompensationStatus::Released {
            if reflects(&record, &order) {
                record.mark_completed();
                self.compensations.update(&record).await?;
                tracing::warn!(
                    record_id = %record.id,
                    order_id = %record.order_id,
                    "order already reflects the change; compensation closed without a release"
                );
                return Ok(record);
            }
            if !matches_order(&record, &order) {
                return Err(FulfillmentError::CompensationMismatch {
                    record_id: record.id,
                    order_id: record.order_id,
                });
            }
            record = self.release(ctx, record).await?;
        }

        let record = self.finish(record, &mut order).await?;
        tracing::info!(
            record_id = %record.id,
            order_id = %record.order_id,
            "compensation resolved on retry"
        );
        Ok(record)
    }

    /// The unresolved compensation record of an order, if any.
    async fn outstanding(&self, id: OrderId) -> Result<Option<CompensationRecord>> {
        let records = self.compensations.for_order(id).await?;
        Ok(records.into_iter().find(|r| r.status.is_unresolved()))
    }

    /// Records and performs a stock release for `order`.
    async fn compensate(
        &self,
        ctx: &RequestContext,
        order: &Order,
        quantity: u32,
        reason: CompensationReason,
    ) -> Result<CompensationRecord> {
        let record = CompensationRecord::pending(order, quantity, reason);
        self.compensations.record(&record).await?;
        self.release(ctx, record).await
    }

    /// Releases the stock a record owes and marks it released.
    ///
    /// A failed release marks the record failed and escalates. Once the
    /// inventory confirmed the release, a failure to persist the new status
    /// is logged and the order change still goes ahead.
    async fn release(
        &self,
        ctx: &RequestContext,
        mut record: CompensationRecord,
    ) -> Result<CompensationRecord> {
        if let Err(e) = self.stock.release(ctx, &record.sku, record.quantity).await {
            record.mark_failed(e.to_string());
            if let Err(store_err) = self.compensations.update(&record).await {
                tracing::error!(
                    record_id = %record.id,
                    error = %store_err,
                    "could not mark compensation failed; record stays pending"
                );
            }
            return Err(escalate(&record, e));
        }

        record.mark_released();
        if let Err(e) = self.compensations.update(&record).await {
            tracing::error!(
                record_id = %record.id,
                error = %e,
                "could not mark compensation released"
            );
        }
        Ok(record)
    }

    /// Applies the order change of a released record and completes the record.
    ///
    /// The stock is already back in inventory, so every failure here is
    /// reported as [`FulfillmentError::OrderOutOfSync`].
    async fn finish(
        &self,
        mut record: CompensationRecord,
        order: &mut Order,
    ) -> Result<CompensationRecord> {
        if !reflects(&record, order) {
            if !matches_order(&record, order) {
                let mismatch = FulfillmentError::CompensationMismatch {
                    record_id: record.id,
                    order_id: record.order_id,
                };
                return Err(out_of_sync(&record, mismatch));
            }
            let change = match (record.reason, record.order_quantity_after()) {
                (CompensationReason::Cancel, _) => order.cancel(),
                (CompensationReason::Decrease, Some(quantity)) => order.set_quantity(quantity),
                (CompensationReason::Decrease, None) => Err(OrderError::InvalidQuantity {
                    quantity: i64::from(record.order_quantity) - i64::from(record.quantity),
                }),
            };
            if let Err(e) = change {
                return Err(out_of_sync(&record, e.into()));
            }
            if let Err(e) = self.orders.save(order).await {
                return Err(out_of_sync(&record, e.into()));
            }
        }

        record.mark_completed();
        if let Err(e) = self.compensations.update(&record).await {
            return Err(out_of_sync(&record, e.into()));
        }
        Ok(record)
    }
}

/// True if the order already shows the change the record was written for.
///
/// A canceled order has returned all of its stock, so no earlier release is
/// still owed for it.
fn reflects(record: &CompensationRecord, order: &Order) -> bool {
    if order.status().is_terminal() {
        return true;
    }
    record.reason == CompensationReason::Decrease
        && record.order_quantity_after() == Some(order.quantity())
}

/// True if the order is still in the state the record was written against.
fn matches_order(record: &CompensationRecord, order: &Order) -> bool {
    order.status().can_cancel()
        && order.quantity() == record.order_quantity
        && record.order_quantity_after().is_some()
}

/// Turns a failed release into a compensation incident.
fn escalate(record: &CompensationRecord, cause: FulfillmentError) -> FulfillmentError {
    metrics::counter!("compensation_failures_total").increment(1);
    tracing::error!(
        record_id = %record.id,
        order_id = %record.order_id,
        sku = %record.sku,
        quantity = record.quantity,
        reason = %record.reason,
        error = %cause,
        "stock release failed; orders and inventory are out of sync"
    );
    FulfillmentError::FatalCompensation {
        record_id: record.id,
        order_id: record.order_id,
        sku: record.sku.clone(),
        quantity: record.quantity,
        reason: record.reason,
        cause: Box::new(cause),
    }
}

/// A local write failed after the inventory confirmed a release.
fn out_of_sync(record: &CompensationRecord, cause: FulfillmentError) -> FulfillmentError {
    metrics::counter!("orders_out_of_sync_total").increment(1);
    tracing::error!(
        record_id = %record.id,
        order_id = %record.order_id,
        sku = %record.sku,
        quantity = record.quantity,
        reason = %record.reason,
        error = %cause,
        "stock released but the order was not updated; retry the compensation, not the request"
    );
    FulfillmentError::OrderOutOfSync {
        record_id: record.id,
        order_id: record.order_id,
        cause: Box::new(cause),
    }
}

fn record_duration(operation: &'static str, started: Instant) {
    metrics::histogram!("order_workflow_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}
