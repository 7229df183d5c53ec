//! Operator endpoints for unresolved stock releases.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use fulfillment::InventoryAuthority;
use order_store::{CompensationLog, CompensationRecord, OrderRepository};
use serde::Serialize;
use uuid::Uuid;

use super::orders::AppState;
use crate::error::ApiError;
use crate::extract::Caller;

#[derive(Serialize)]
pub struct CompensationResponse {
    pub id: Uuid,
    pub order_id: i64,
    pub sku: String,
    pub quantity: u32,
    pub order_quantity: u32,
    pub reason: String,
    pub status: String,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&CompensationRecord> for CompensationResponse {
    fn from(record: &CompensationRecord) -> Self {
        Self {
            id: record.id,
            order_id: record.order_id.as_i64(),
            sku: record.sku.to_string(),
            quantity: record.quantity,
            order_quantity: record.order_quantity,
            reason: record.reason.to_string(),
            status: record.status.to_string(),
            attempts: record.attempts,
            last_error: record.last_error.clone(),
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

/// GET /api/v1/compensations: records that are not completed.
#[tracing::instrument(skip(state))]
pub async fn list<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
) -> Result<Json<Vec<CompensationResponse>>, ApiError>
where
    S: OrderRepository + CompensationLog + 'static,
    I: InventoryAuthority + 'static,
{
    let records = state.workflow.pending_compensations().await?;
    Ok(Json(records.iter().map(CompensationResponse::from).collect()))
}

/// POST /api/v1/compensations/{id}/retry: finish an unresolved record.
///
/// Check the product's stock first; a release that timed out may have applied.
#[tracing::instrument(skip(state, caller))]
pub async fn retry<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<CompensationResponse>, ApiError>
where
    S: OrderRepository + CompensationLog + 'static,
    I: InventoryAuthority + 'static,
{
    let record = state.workflow.retry_compensation(&caller, id).await?;
    Ok(Json(CompensationResponse::from(&record)))
}
