use std::sync::Arc;

use axum::handler::Handler;
use axum::routing::{get, MethodRouter};
use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::admin::{admin_router, tenant_router};
use crate::middlewares::{QuotaGateLayer, TenantContextLayer, UsageMetricsLayer};
use crate::FolioState;

/// Router builder that wires the tenant pipeline around every route.
///
/// Per request, outermost first: request id, trace, tenant resolution and
/// context binding, quota gate, usage metrics, handler. A request rejected
/// by the quota gate is never counted in metrics.
pub struct FolioApp {
    pub state: FolioState,
    routes: Router<FolioState>,
}

impl FolioApp {
    /// A new app with the admin and tenant usage routes mounted.
    pub fn new(state: FolioState) -> Self {
        Self {
            state,
            routes: Router::new().merge(admin_router()).merge(tenant_router()),
        }
    }

    pub fn route(mut self, path: &str, method_router: MethodRouter<FolioState>) -> Self {
        self.routes = self.routes.route(path, method_router);
        self
    }

    pub fn use_get<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, FolioState> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.route(path, get(handler))
    }

    pub fn into_router(self) -> Router {
        let state = self.state;
        let gate = QuotaGateLayer::new(Arc::clone(&state.quota), state.quota_gate.clone());

        self.routes
            .route_layer(UsageMetricsLayer::new(Arc::clone(&state.metrics)))
            .route_layer(gate)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TenantContextLayer::new(Arc::clone(&state.resolver))),
            )
            .with_state(state)
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Folio listening on {}", listener.local_addr()?);
        axum::serve(listener, self.into_router()).await?;
        Ok(())
    }
}
