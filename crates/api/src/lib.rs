//! HTTP API server with observability for the order service.
//!
//! Provides REST endpoints for orders and for operator handling of failed
//! stock releases, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use fulfillment::{HttpInventoryClient, InventoryAuthority, OrderWorkflow, StockCoordinator};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{CompensationLog, OrderRepository};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, I>(state: Arc<AppState<S, I>>, metrics_handle: PrometheusHandle) -> Router
where
    S: OrderRepository + CompensationLog + 'static,
    I: InventoryAuthority + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/api/v1/order",
            post(routes::orders::create::<S, I>).get(routes::orders::list::<S, I>),
        )
        .route(
            "/api/v1/order/{id}",
            get(routes::orders::get::<S, I>)
                .put(routes::orders::update::<S, I>)
                .delete(routes::orders::cancel::<S, I>),
        )
        .route(
            "/api/v1/compensations",
            get(routes::compensations::list::<S, I>),
        )
        .route(
            "/api/v1/compensations/{id}/retry",
            post(routes::compensations::retry::<S, I>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over one store used for both orders and
/// compensation records.
pub fn create_state<S, I>(store: S, inventory: I, conflict_retries: u32) -> Arc<AppState<S, I>>
where
    S: OrderRepository + CompensationLog + Clone,
    I: InventoryAuthority,
{
    let stock = StockCoordinator::new(inventory).with_conflict_retries(conflict_retries);
    Arc::new(AppState {
        workflow: OrderWorkflow::new(store.clone(), store, stock),
    })
}

/// Builds the inventory client from configuration.
pub fn inventory_client(config: &Config) -> Result<HttpInventoryClient, fulfillment::InventoryError> {
    HttpInventoryClient::with_options(
        &config.inventory_url,
        config.inventory_timeout,
        config.read_retry_policy(),
    )
}
