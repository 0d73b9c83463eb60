use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::Request,
    http::Method,
    response::{IntoResponse, Response},
};
use folio_core::{ConfigSnapshot, TenantContext, TenantDescriptor};
use folio_usage::UsageQuotaEnforcer;
use serde::Deserialize;
use tower::{Layer, Service};

use crate::FolioAxumError;

/// Which requests the quota gate charges (`quota.*` keys).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QuotaGateSettings {
    /// Never charged, checked first.
    pub exempt_prefixes: Vec<String>,
    /// Charged when matched. Empty means every path.
    pub enforced_prefixes: Vec<String>,
}

impl Default for QuotaGateSettings {
    fn default() -> Self {
        Self {
            exempt_prefixes: vec!["/public/signup".into(), "/api/v1/admin".into()],
            enforced_prefixes: vec!["/api/".into(), "/public/".into(), "/pipeline".into()],
        }
    }
}

impl QuotaGateSettings {
    pub fn from_config(config: &ConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            exempt_prefixes: config
                .get_list("quota.exempt_prefixes")
                .unwrap_or(defaults.exempt_prefixes),
            enforced_prefixes: config
                .get_list("quota.enforced_prefixes")
                .unwrap_or(defaults.enforced_prefixes),
        }
    }

    /// Whether a request to `path` made with `method` by `tenant` costs one
    /// operation.
    pub fn should_enforce(&self, method: &Method, path: &str, tenant: &TenantDescriptor) -> bool {
        if !tenant.is_metered() {
            return false;
        }
        if method == Method::GET || method == Method::HEAD {
            return false;
        }
        if self.exempt_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return false;
        }
        self.enforced_prefixes.is_empty()
            || self.enforced_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// Charges one operation to the bound tenant before the handler runs.
///
/// On rejection the handler is never called. A charged operation is kept
/// even if the handler then fails.
#[derive(Clone)]
pub struct QuotaGateLayer {
    quota: Arc<UsageQuotaEnforcer>,
    settings: Arc<QuotaGateSettings>,
}

impl QuotaGateLayer {
    pub fn new(quota: Arc<UsageQuotaEnforcer>, settings: QuotaGateSettings) -> Self {
        Self {
            quota,
            settings: Arc::new(settings),
        }
    }
}

impl<S> Layer<S> for QuotaGateLayer {
    type Service = QuotaGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        QuotaGateService {
            inner,
            quota: Arc::clone(&self.quota),
            settings: Arc::clone(&self.settings),
        }
    }
}

#[derive(Clone)]
pub struct QuotaGateService<S> {
    inner: S,
    quota: Arc<UsageQuotaEnforcer>,
    settings: Arc<QuotaGateSettings>,
}

impl<S> Service<Request> for QuotaGateService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let quota = Arc::clone(&self.quota);
        let settings = Arc::clone(&self.settings);

        Box::pin(async move {
            if let Some(tenant) = TenantContext::current() {
                if settings.should_enforce(req.method(), req.uri().path(), &tenant) {
                    if let Err(err) = quota.consume_operation(&tenant, 1).await {
                        return Ok(FolioAxumError::from(err).into_response());
                    }
                }
            }
            inner.call(req).await
        })
    }
}
