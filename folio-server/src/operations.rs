use std::collections::HashMap;

use axum::extract::{Path, Query};
use axum::{Extension, Json};
use folio_axum::{FilesProcessed, FolioAxumError};
use folio_core::{FolioError, TenantContext};
use serde_json::{json, Value};

/// Stand-in for a document operation: echoes who ran what.
///
/// `?files=N` is reported as the number of files processed.
pub async fn run_operation(
    Path(operation): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<(Extension<FilesProcessed>, Json<Value>), FolioAxumError> {
    let files = match query.get("files") {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| FolioError::bad_request("`files` must be a non-negative integer"))?,
        None => 0,
    };
    let tenant = TenantContext::current().map(|t| t.slug.clone());

    tracing::debug!("Running operation '{}' for tenant {:?}", operation, tenant);

    Ok((
        Extension(FilesProcessed(files)),
        Json(json!({
            "operation": operation,
            "tenant": tenant,
            "files": files,
        })),
    ))
}
