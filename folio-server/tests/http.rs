use axum::body::Body;
use axum::http::{Request, StatusCode};
use folio_core::{FolioConfig, TenantLimits, TenantPlan};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

fn saas_config() -> FolioConfig {
    let mut config = folio_server::default_config();
    config.set("saas.enabled", "true");
    config.set("saas.tenant_header", "X-Tenant");
    config
}

fn post(uri: &str, tenant: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-tenant", tenant)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_ok_and_carries_a_request_id() -> anyhow::Result<()> {
    let server = folio_server::build_with(folio_server::default_config())?;
    let res = server
        .app
        .into_router()
        .oneshot(Request::get("/health").body(Body::empty())?)
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("x-request-id").is_some());
    assert_eq!(res.headers().get("x-tenant-resolved").unwrap(), "default");
    let bytes = res.into_body().collect().await?.to_bytes();
    assert_eq!(&bytes[..], b"ok");
    Ok(())
}

#[tokio::test]
async fn operations_are_metered_per_tenant() -> anyhow::Result<()> {
    let server = folio_server::build_with(saas_config())?;
    server.tenants.create_tenant(
        "initech",
        "Initech",
        TenantPlan::Free,
        TenantLimits {
            monthly_operation_limit: Some(1),
            storage_limit_mb: None,
        },
    )?;
    let metrics = server.app.state.metrics.clone();
    let router = server.app.into_router();

    let res = router
        .clone()
        .oneshot(post("/api/v1/operations/merge?files=3", "initech"))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["operation"], "merge");
    assert_eq!(body["tenant"], "initech");
    assert_eq!(body["files"], 3);

    let res = router
        .clone()
        .oneshot(post("/api/v1/operations/split", "initech"))
        .await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let snapshot = metrics.snapshot();
    let initech = snapshot.tenant("initech").unwrap();
    assert_eq!(initech.total_operations, 1);
    assert_eq!(initech.total_files_processed, 3);
    assert_eq!(
        initech.entries[0].operation,
        "POST api/v1/operations/{operation}"
    );
    Ok(())
}

#[tokio::test]
async fn bad_files_parameter_is_a_client_error() -> anyhow::Result<()> {
    let server = folio_server::build_with(saas_config())?;
    let res = server
        .app
        .into_router()
        .oneshot(post("/api/v1/operations/merge?files=lots", "default"))
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["name"], "BadRequest");
    Ok(())
}

#[tokio::test]
async fn maintenance_only_runs_in_multi_tenant_mode() -> anyhow::Result<()> {
    let single = folio_server::build_with(folio_server::default_config())?;
    assert!(single.spawn_maintenance().is_none());

    let multi = folio_server::build_with(saas_config())?;
    let handle = multi.spawn_maintenance().expect("sweeper should start");
    handle.abort();
    Ok(())
}

#[test]
fn addr_comes_from_config() -> anyhow::Result<()> {
    let mut config = folio_server::default_config();
    config.set("http.port", "9191");
    let server = folio_server::build_with(config)?;
    assert_eq!(server.addr(), "127.0.0.1:9191");
    Ok(())
}
