use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    response::Response,
};
use folio_core::{TenantContext, TenantResolver};
use tower::{Layer, Service};

use crate::signals::request_signals;

pub static TENANT_RESOLVED_HEADER: HeaderName = HeaderName::from_static("x-tenant-resolved");

/// Resolves the tenant for each request and runs everything downstream
/// inside [`TenantContext::scope`].
///
/// This is the one place requests enter and leave the tenant scope. The
/// binding ends with the downstream future, however it ends. The resolved
/// descriptor is also put in the request extensions.
#[derive(Clone)]
pub struct TenantContextLayer {
    resolver: Arc<TenantResolver>,
}

impl TenantContextLayer {
    pub fn new(resolver: Arc<TenantResolver>) -> Self {
        Self { resolver }
    }
}

impl<S> Layer<S> for TenantContextLayer {
    type Service = TenantContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TenantContextService {
            inner,
            resolver: Arc::clone(&self.resolver),
        }
    }
}

#[derive(Clone)]
pub struct TenantContextService<S> {
    inner: S,
    resolver: Arc<TenantResolver>,
}

impl<S> Service<Request> for TenantContextService<S>
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

    fn call(&mut self, mut req: Request) -> Self::Future {
        // Take the instance that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let resolver = Arc::clone(&self.resolver);

        Box::pin(async move {
            let signals = request_signals(req.method(), req.uri(), req.headers());
            let tenant = resolver.resolve(&signals).await;
            req.extensions_mut().insert(Arc::clone(&tenant));

            let slug = tenant.slug.clone();
            let mut response =
                TenantContext::scope(tenant, async move { inner.call(req).await }).await?;

            if let Ok(value) = HeaderValue::from_str(&slug) {
                response
                    .headers_mut()
                    .insert(TENANT_RESOLVED_HEADER.clone(), value);
            }
            Ok(response)
        })
    }
}
