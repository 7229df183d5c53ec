//! Request context extraction from gateway headers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use common::{Principal, RequestContext};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

/// The caller of the current request.
///
/// Built from the headers the gateway sets after validating the token. The
/// `Authorization` value is kept verbatim so it can be forwarded to the
/// inventory service.
#[derive(Debug, Clone)]
pub struct Caller(pub RequestContext);

impl Caller {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let user_id = header_text(headers, USER_ID_HEADER).and_then(|v| match v.trim().parse() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::debug!(value = v, "ignoring malformed user id header");
                None
            }
        });
        let roles = header_text(headers, USER_ROLES_HEADER)
            .map(Principal::parse_roles)
            .unwrap_or_default();
        let authorization = header_text(headers, AUTHORIZATION.as_str()).map(String::from);

        Caller(RequestContext::new(
            Principal::new(user_id, roles),
            authorization,
        ))
    }
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller::from_headers(&parts.headers))
    }
}
