//! Per-request caller context.
//!
//! The context is created once at the HTTP edge and passed by reference through
//! every call that may reach another service. Nothing here is stored in
//! process-wide or task-local state.

use serde::{Deserialize, Serialize};

/// The authenticated caller as established by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Numeric user identifier, if the gateway supplied one.
    pub user_id: Option<i64>,
    /// Role names granted to the caller.
    pub roles: Vec<String>,
}

impl Principal {
    /// Creates a principal for the given user and roles.
    pub fn new(user_id: Option<i64>, roles: Vec<String>) -> Self {
        Self { user_id, roles }
    }

    /// Parses a comma-separated role header value, dropping empty entries.
    pub fn parse_roles(header: &str) -> Vec<String> {
        header
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Context carried through one order use case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    principal: Principal,
    authorization: Option<String>,
}

impl RequestContext {
    /// Creates a context with a principal and the raw `Authorization` header.
    pub fn new(principal: Principal, authorization: Option<String>) -> Self {
        Self {
            principal,
            authorization,
        }
    }

    /// Context for internal calls with no inbound caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Returns the caller.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the `Authorization` header value to forward, if any.
    ///
    /// Empty header values are treated as absent.
    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref().filter(|v| !v.is_empty())
    }
}
