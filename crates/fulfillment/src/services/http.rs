//! HTTP client for the inventory service.

use std::time::Duration;

use async_trait::async_trait;
use common::{RequestContext, Sku};
use reqwest::{StatusCode, Url, header};

use super::inventory::{InventoryAuthority, InventoryError, Product};
use super::retry::RetryPolicy;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Inventory service client over `GET`/`PUT {base}/api/inventory/{sku}`.
///
/// Reads are retried per the configured [`RetryPolicy`]; writes are sent
/// exactly once. The caller's `Authorization` header is forwarded verbatim.
#[derive(Clone)]
pub struct HttpInventoryClient {
    base_url: Url,
    client: reqwest::Client,
    read_retry: RetryPolicy,
}

impl HttpInventoryClient {
    /// Creates a client with the default timeout and read retry policy.
    pub fn new(base_url: &str) -> Result<Self, InventoryError> {
        Self::with_options(base_url, DEFAULT_REQUEST_TIMEOUT, RetryPolicy::default())
    }

    /// Creates a client with an explicit per-request timeout and read retry policy.
    pub fn with_options(
        base_url: &str,
        timeout: Duration,
        read_retry: RetryPolicy,
    ) -> Result<Self, InventoryError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            InventoryError::Communication(format!("invalid inventory URL '{base_url}': {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(InventoryError::Communication(format!(
                "inventory URL '{base_url}' cannot be a base"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| {
                InventoryError::Communication(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            base_url,
            client,
            read_retry,
        })
    }

    fn product_url(&self, sku: &Sku) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "inventory", sku.as_str()]);
        }
        url
    }

    fn authorize(
        request: reqwest::RequestBuilder,
        ctx: &RequestContext,
    ) -> reqwest::RequestBuilder {
        match ctx.authorization() {
            Some(value) => request.header(header::AUTHORIZATION, value),
            None => request,
        }
    }
}

async fn error_body(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}

#[async_trait]
impl InventoryAuthority for HttpInventoryClient {
    #[tracing::instrument(skip(self, ctx), fields(sku = %sku))]
    async fn get_product(
        &self,
        ctx: &RequestContext,
        sku: &Sku,
    ) -> Result<Option<Product>, InventoryError> {
        let url = self.product_url(sku);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let request = Self::authorize(self.client.get(url.clone()), ctx);

            let failure = match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    return resp.json::<Product>().await.map(Some).map_err(|e| {
                        InventoryError::Communication(format!("invalid product payload: {e}"))
                    });
                }
                Ok(resp) if resp.status() == StatusCode::NOT_FOUND => return Ok(None),
                Ok(resp) => {
                    let status = resp.status();
                    let body = error_body(resp).await;
                    let message = format!("inventory lookup failed (status={status}): {body}");
                    if !(status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS) {
                        return Err(InventoryError::Communication(message));
                    }
                    message
                }
                // Timeouts fail fast; a hung service should not multiply the wait.
                Err(err) if err.is_timeout() => {
                    return Err(InventoryError::Communication(format!(
                        "inventory lookup timed out: {err}"
                    )));
                }
                Err(err) => format!("inventory lookup failed: {err}"),
            };

            match self.read_retry.delay_for(attempt) {
                Some(delay) => {
                    tracing::warn!(attempt, error = %failure, "retrying inventory lookup");
                    tokio::time::sleep(delay).await;
                }
                None => return Err(InventoryError::Communication(failure)),
            }
        }
    }

    #[tracing::instrument(skip(self, ctx, product), fields(sku = %product.sku, quantity = product.quantity))]
    async fn update_product(
        &self,
        ctx: &RequestContext,
        product: &Product,
    ) -> Result<Option<Product>, InventoryError> {
        let mut request =
            Self::authorize(self.client.put(self.product_url(&product.sku)), ctx).json(product);
        if let Some(version) = product.version {
            request = request.header(header::IF_MATCH, version.to_string());
        }

        let response = request.send().await.map_err(|e| {
            InventoryError::Communication(format!("inventory update failed: {e}"))
        })?;

        let status = response.status();
        match status {
            s if s.is_success() => match response.json::<Product>().await {
                Ok(updated) => Ok(Some(updated)),
                Err(e) => {
                    // The write may have landed; the caller cannot tell.
                    Err(InventoryError::Communication(format!(
                        "invalid update response: {e}"
                    )))
                }
            },
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
                Err(InventoryError::Conflict(product.sku.clone()))
            }
            s if s.is_client_error() => Err(InventoryError::Rejected {
                sku: product.sku.clone(),
                status: s.as_u16(),
            }),
            _ => {
                let body = error_body(response).await;
                Err(InventoryError::Communication(format!(
                    "inventory update failed (status={status}): {body}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::{Path, State};
    use axum::http::HeaderMap;
    use axum::routing::get;
    use common::Principal;

    use super::*;

    #[derive(Default)]
    struct FakeInventory {
        products: Mutex<HashMap<String, Product>>,
        authorizations: Mutex<Vec<String>>,
        if_match: Mutex<Vec<String>>,
        gets: AtomicUsize,
        puts: AtomicUsize,
        fail_gets: AtomicUsize,
        put_status: Mutex<Option<StatusCode>>,
    }

    type Shared = Arc<FakeInventory>;

    fn remember_auth(fake: &FakeInventory, headers: &HeaderMap) {
        if let Some(value) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        {
            fake.authorizations.lock().unwrap().push(value.to_string());
        }
    }

    async fn get_product(
        State(fake): State<Shared>,
        Path(sku): Path<String>,
        headers: HeaderMap,
    ) -> axum::response::Response {
        use axum::response::IntoResponse;

        fake.gets.fetch_add(1, Ordering::SeqCst);
        remember_auth(&fake, &headers);

        if fake.fail_gets.load(Ordering::SeqCst) > 0 {
            fake.fail_gets.fetch_sub(1, Ordering::SeqCst);
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }

        match fake.products.lock().unwrap().get(&sku) {
            Some(p) => axum::Json(p.clone()).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn put_product(
        State(fake): State<Shared>,
        Path(sku): Path<String>,
        headers: HeaderMap,
        axum::Json(body): axum::Json<Product>,
    ) -> axum::response::Response {
        use axum::response::IntoResponse;

        fake.puts.fetch_add(1, Ordering::SeqCst);
        remember_auth(&fake, &headers);
        if let Some(v) = headers.get(header::IF_MATCH).and_then(|v| v.to_str().ok()) {
            fake.if_match.lock().unwrap().push(v.to_string());
        }

        if let Some(status) = *fake.put_status.lock().unwrap() {
            return status.into_response();
        }

        let mut products = fake.products.lock().unwrap();
        if !products.contains_key(&sku) {
            return StatusCode::NOT_FOUND.into_response();
        }
        products.insert(sku, body.clone());
        axum::Json(body).into_response()
    }

    async fn spawn_inventory(fake: Shared) -> String {
        let app = Router::new()
            .route(
                "/api/inventory/{sku}",
                get(get_product).put(put_product),
            )
            .with_state(fake);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        format!("http://{addr}")
    }

    fn seeded(products: &[Product]) -> Shared {
        let fake = FakeInventory::default();
        {
            let mut map = fake.products.lock().unwrap();
            for p in products {
                map.insert(p.sku.to_string(), p.clone());
            }
        }
        Arc::new(fake)
    }

    fn client(base: &str) -> HttpInventoryClient {
        HttpInventoryClient::with_options(
            base,
            Duration::from_secs(2),
            RetryPolicy::new(2, Duration::from_millis(5)),
        )
        .unwrap()
    }

    fn ctx() -> RequestContext {
        RequestContext::new(
            Principal::new(Some(7), vec!["ROLE_USER".to_string()]),
            Some("Bearer abc.def".to_string()),
        )
    }

    #[tokio::test]
    async fn get_product_found_and_missing() {
        let fake = seeded(&[Product::new("SKU-001", 10)]);
        let base = spawn_inventory(fake.clone()).await;
        let client = client(&base);

        let product = client
            .get_product(&ctx(), &Sku::new("SKU-001"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.quantity, 10);
        assert!(product.active);

        let missing = client.get_product(&ctx(), &Sku::new("NOPE")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn forwards_authorization_header_verbatim() {
        let fake = seeded(&[Product::new("SKU-001", 10)]);
        let base = spawn_inventory(fake.clone()).await;
        let client = client(&base);

        let product = client
            .get_product(&ctx(), &Sku::new("SKU-001"))
            .await
            .unwrap()
            .unwrap();
        client
            .update_product(&ctx(), &product.with_quantity(9))
            .await
            .unwrap();

        let seen = fake.authorizations.lock().unwrap().clone();
        assert_eq!(seen, vec!["Bearer abc.def", "Bearer abc.def"]);
    }

    #[tokio::test]
    async fn no_authorization_header_without_caller_token() {
        let fake = seeded(&[Product::new("SKU-001", 10)]);
        let base = spawn_inventory(fake.clone()).await;

        client(&base)
            .get_product(&RequestContext::anonymous(), &Sku::new("SKU-001"))
            .await
            .unwrap();
        assert!(fake.authorizations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_is_retried_on_server_error() {
        let fake = seeded(&[Product::new("SKU-001", 10)]);
        fake.fail_gets.store(2, Ordering::SeqCst);
        let base = spawn_inventory(fake.clone()).await;

        let product = client(&base)
            .get_product(&ctx(), &Sku::new("SKU-001"))
            .await
            .unwrap();
        assert!(product.is_some());
        assert_eq!(fake.gets.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn read_gives_up_after_retries() {
        let fake = seeded(&[Product::new("SKU-001", 10)]);
        fake.fail_gets.store(10, Ordering::SeqCst);
        let base = spawn_inventory(fake.clone()).await;

        let result = client(&base)
            .get_product(&ctx(), &Sku::new("SKU-001"))
            .await;
        assert!(matches!(result, Err(InventoryError::Communication(_))));
        assert_eq!(fake.gets.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn write_is_not_retried() {
        let fake = seeded(&[Product::new("SKU-001", 10)]);
        *fake.put_status.lock().unwrap() = Some(StatusCode::SERVICE_UNAVAILABLE);
        let base = spawn_inventory(fake.clone()).await;

        let result = client(&base)
            .update_product(&ctx(), &Product::new("SKU-001", 5))
            .await;
        assert!(matches!(result, Err(InventoryError::Communication(_))));
        assert_eq!(fake.puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn versioned_write_sends_if_match_and_maps_conflict() {
        let fake = seeded(&[Product::new("SKU-001", 10).with_version(4)]);
        *fake.put_status.lock().unwrap() = Some(StatusCode::PRECONDITION_FAILED);
        let base = spawn_inventory(fake.clone()).await;

        let result = client(&base)
            .update_product(&ctx(), &Product::new("SKU-001", 5).with_version(4))
            .await;
        assert_eq!(result, Err(InventoryError::Conflict(Sku::new("SKU-001"))));
        assert_eq!(fake.if_match.lock().unwrap().clone(), vec!["4"]);
    }

    #[tokio::test]
    async fn rejected_and_missing_writes() {
        let fake = seeded(&[Product::new("SKU-001", 10)]);
        let base = spawn_inventory(fake.clone()).await;
        let client = client(&base);

        let missing = client
            .update_product(&ctx(), &Product::new("NOPE", 1))
            .await
            .unwrap();
        assert!(missing.is_none());

        *fake.put_status.lock().unwrap() = Some(StatusCode::BAD_REQUEST);
        let rejected = client
            .update_product(&ctx(), &Product::new("SKU-001", 1))
            .await;
        assert!(matches!(
            rejected,
            Err(InventoryError::Rejected { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_service_is_communication_error() {
        let client = HttpInventoryClient::with_options(
            "http://127.0.0.1:1",
            Duration::from_millis(500),
            RetryPolicy::none(),
        )
        .unwrap();

        let result = client.get_product(&ctx(), &Sku::new("SKU-001")).await;
        assert!(matches!(result, Err(InventoryError::Communication(_))));
    }

    #[test]
    fn product_url_encodes_sku_and_keeps_base_path() {
        let client = HttpInventoryClient::new("http://inventory:8081/").unwrap();
        assert_eq!(
            client.product_url(&Sku::new("SKU 1")).as_str(),
            "http://inventory:8081/api/inventory/SKU%201"
        );

        let client = HttpInventoryClient::new("http://gateway/inv").unwrap();
        assert_eq!(
            client.product_url(&Sku::new("A")).as_str(),
            "http://gateway/inv/api/inventory/A"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(HttpInventoryClient::new("not a url").is_err());
    }
}
