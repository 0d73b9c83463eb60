use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::{MatchedPath, Request},
    response::Response,
};
use folio_usage::UsageMetricsAggregator;
use tower::{Layer, Service};

/// Response extension a handler sets to report how many files it touched.
///
/// The layer never inspects request bodies, multipart uploads included: a
/// response without this extension is recorded with zero files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilesProcessed(pub u64);

/// `"<METHOD> <pattern>"` with the pattern tidied up:
/// `POST` + `//api/v1/convert/**` -> `POST api/v1/convert`.
pub fn operation_name(method: &str, pattern: &str) -> String {
    let mut normalized = String::with_capacity(pattern.len());
    for c in pattern.trim_start_matches('/').chars() {
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }
    let mut normalized = normalized.replace(".*", "");
    for suffix in ["/**", "/*"] {
        if let Some(stripped) = normalized.strip_suffix(suffix) {
            normalized = stripped.to_string();
        }
    }
    format!("{method} {normalized}")
}

/// Records one invocation per completed request, attributed to the tenant
/// bound in the surrounding scope.
///
/// Apply with `Router::route_layer` so the matched route is known.
#[derive(Clone)]
pub struct UsageMetricsLayer {
    metrics: Arc<UsageMetricsAggregator>,
}

impl UsageMetricsLayer {
    pub fn new(metrics: Arc<UsageMetricsAggregator>) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for UsageMetricsLayer {
    type Service = UsageMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        UsageMetricsService {
            inner,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

#[derive(Clone)]
pub struct UsageMetricsService<S> {
    inner: S,
    metrics: Arc<UsageMetricsAggregator>,
}

impl<S> Service<Request> for UsageMetricsService<S>
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
        let metrics = Arc::clone(&self.metrics);

        let pattern = req
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
        let operation = operation_name(req.method().as_str(), &pattern);

        Box::pin(async move {
            let response = inner.call(req).await?;
            let files = response
                .extensions()
                .get::<FilesProcessed>()
                .map_or(0, |f| f.0);
            metrics.record(&operation, files, None);
            Ok(response)
        })
    }
}
