//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, Sku};
use domain::{MAX_QUANTITY, Order};
use fulfillment::{InventoryAuthority, OrderWorkflow};
use order_store::{CompensationLog, OrderRepository};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::Caller;

/// Shared application state accessible from all handlers.
pub struct AppState<S, I>
where
    S: OrderRepository + CompensationLog,
    I: InventoryAuthority,
{
    pub workflow: OrderWorkflow<S, S, I>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub sku: String,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    pub quantity: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub sku: String,
    pub quantity: u32,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().as_i64(),
            sku: order.sku().to_string(),
            quantity: order.quantity(),
            status: order.status().to_string(),
            created_at: order.created_at().to_rfc3339(),
            updated_at: order.updated_at().to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /api/v1/order: reserve stock and create an order.
#[tracing::instrument(skip(state, caller, req), fields(sku = %req.sku, quantity = req.quantity))]
pub async fn create<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Caller(caller): Caller,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    S: OrderRepository + CompensationLog + 'static,
    I: InventoryAuthority + 'static,
{
    let quantity = parse_quantity(req.quantity)?;
    let order = state
        .workflow
        .create_order(&caller, Sku::new(req.sku), quantity)
        .await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /api/v1/order/{id}: load an order.
#[tracing::instrument(skip(state))]
pub async fn get<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: OrderRepository + CompensationLog + 'static,
    I: InventoryAuthority + 'static,
{
    let order = state.workflow.get_order(OrderId::new(id)).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /api/v1/order: list all orders, canceled ones included.
#[tracing::instrument(skip(state))]
pub async fn list<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: OrderRepository + CompensationLog + 'static,
    I: InventoryAuthority + 'static,
{
    let orders = state.workflow.list_orders().await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// PUT /api/v1/order/{id}: change the quantity of an order.
#[tracing::instrument(skip(state, caller, req), fields(quantity = req.quantity))]
pub async fn update<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Caller(caller): Caller,
    Path(id): Path<i64>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: OrderRepository + CompensationLog + 'static,
    I: InventoryAuthority + 'static,
{
    let quantity = parse_quantity(req.quantity)?;
    let order = state
        .workflow
        .update_order_quantity(&caller, OrderId::new(id), quantity)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// DELETE /api/v1/order/{id}: cancel an order and return its stock.
#[tracing::instrument(skip(state, caller))]
pub async fn cancel<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Caller(caller): Caller,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
    S: OrderRepository + CompensationLog + 'static,
    I: InventoryAuthority + 'static,
{
    state.workflow.cancel_order(&caller, OrderId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_quantity(quantity: i64) -> Result<u32, ApiError> {
    match u32::try_from(quantity) {
        Ok(q) if q > 0 && q <= MAX_QUANTITY => Ok(q),
        _ => Err(ApiError::BadRequest(format!(
            "Quantity must be between 1 and {MAX_QUANTITY}, got {quantity}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(3).unwrap(), 3);
        assert!(parse_quantity(0).is_err());
        assert!(parse_quantity(-2).is_err());
        assert_eq!(parse_quantity(i64::from(MAX_QUANTITY)).unwrap(), MAX_QUANTITY);
        assert!(parse_quantity(i64::from(MAX_QUANTITY) + 1).is_err());
        assert!(parse_quantity(3_000_000_000).is_err());
        assert!(parse_quantity(i64::from(u32::MAX) + 1).is_err());
    }
}
