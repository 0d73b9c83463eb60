//! Read and reset endpoints for usage state.
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/api/v1/admin/usage/snapshot` | metrics snapshot (admin) |
//! | POST | `/api/v1/admin/usage/reset` | clear metrics, 204 (admin) |
//! | GET | `/api/v1/admin/license/status` | license status (admin) |
//! | GET | `/api/v1/tenant/usage` | current window for the bound tenant |

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use folio_core::{FolioError, LicenseStatus, TenantContext};
use folio_usage::{TenantUsageReport, UsageMetricsSnapshot};

use crate::{FolioAxumError, FolioState};

/// Decides whether a request carries administrator rights.
pub trait AdminAuthorizer: Send + Sync {
    fn is_admin(&self, headers: &HeaderMap) -> bool;
}

/// Accepts `Authorization: Bearer <token>` for one configured token.
/// With no token configured nobody is an admin.
#[derive(Debug, Clone, Default)]
pub struct AdminToken {
    token: Option<String>,
}

impl AdminToken {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

impl AdminAuthorizer for AdminToken {
    fn is_admin(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.token.as_deref() else {
            return false;
        };
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|given| given.trim() == expected)
    }
}

fn require_admin(state: &FolioState, headers: &HeaderMap) -> Result<(), FolioAxumError> {
    if state.admin.is_admin(headers) {
        Ok(())
    } else {
        Err(FolioError::forbidden("Administrator access required").into())
    }
}

pub fn admin_router() -> Router<FolioState> {
    Router::new()
        .route("/api/v1/admin/usage/snapshot", get(usage_snapshot))
        .route("/api/v1/admin/usage/reset", post(usage_reset))
        .route("/api/v1/admin/license/status", get(license_status))
}

pub fn tenant_router() -> Router<FolioState> {
    Router::new().route("/api/v1/tenant/usage", get(tenant_usage))
}

async fn usage_snapshot(
    State(state): State<FolioState>,
    headers: HeaderMap,
) -> Result<Json<UsageMetricsSnapshot>, FolioAxumError> {
    require_admin(&state, &headers)?;
    Ok(Json(state.metrics.snapshot()))
}

async fn usage_reset(
    State(state): State<FolioState>,
    headers: HeaderMap,
) -> Result<StatusCode, FolioAxumError> {
    require_admin(&state, &headers)?;
    state.metrics.reset();
    Ok(StatusCode::NO_CONTENT)
}

async fn license_status(
    State(state): State<FolioState>,
    headers: HeaderMap,
) -> Result<Json<LicenseStatus>, FolioAxumError> {
    require_admin(&state, &headers)?;
    Ok(Json(state.license.status()))
}

async fn tenant_usage(
    State(state): State<FolioState>,
) -> Result<Json<TenantUsageReport>, FolioAxumError> {
    let tenant = TenantContext::current()
        .ok_or_else(|| FolioError::general_error("No tenant bound to this request"))?;
    Ok(Json(state.quota.usage_report(&tenant).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn token_must_match() {
        let admin = AdminToken::new(Some("s3cret".into()));
        assert!(admin.is_admin(&bearer("Bearer s3cret")));
        assert!(!admin.is_admin(&bearer("Bearer nope")));
        assert!(!admin.is_admin(&bearer("s3cret")));
        assert!(!admin.is_admin(&HeaderMap::new()));
    }

    #[test]
    fn no_token_means_no_admin() {
        let admin = AdminToken::new(Some("   ".into()));
        assert!(!admin.is_admin(&bearer("Bearer ")));
        assert!(!AdminToken::default().is_admin(&bearer("Bearer anything")));
    }
}
