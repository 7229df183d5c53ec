//! Prometheus metrics endpoint and metric descriptions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics::{Unit, describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusHandle;

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}

/// Registers help text for the order workflow metrics.
pub fn describe() {
    describe_counter!("orders_created_total", "Orders created after a confirmed reservation");
    describe_counter!("orders_canceled_total", "Orders canceled after their stock was returned");
    describe_counter!("stock_reservations_total", "Stock reservations confirmed by inventory");
    describe_counter!("stock_releases_total", "Stock releases confirmed by inventory");
    describe_counter!(
        "compensation_failures_total",
        "Stock releases that failed and need operator action"
    );
    describe_counter!(
        "orders_out_of_sync_total",
        "Stock releases whose order change could not be persisted"
    );
    describe_counter!(
        "orphaned_reservations_total",
        "Reservations whose order could not be persisted"
    );
    describe_histogram!(
        "order_workflow_duration_seconds",
        Unit::Seconds,
        "Duration of order workflow operations"
    );
}
