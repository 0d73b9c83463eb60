use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use folio_core::errors::FolioError;
use folio_usage::UsageError;

#[derive(Debug)]
pub struct FolioAxumError(pub anyhow::Error);

impl From<anyhow::Error> for FolioAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<FolioError> for FolioAxumError {
    fn from(e: FolioError) -> Self {
        Self(e.into_anyhow())
    }
}

impl From<UsageError> for FolioAxumError {
    fn from(e: UsageError) -> Self {
        FolioError::from(e).into()
    }
}

impl IntoResponse for FolioAxumError {
    fn into_response(self) -> Response {
        // Keep the structured fields even when wrapped in anyhow contexts.
        if let Some(folio) = FolioError::find_in(&self.0) {
            return render(folio);
        }

        // Anything else: a GeneralError without the internal message.
        tracing::error!("Unhandled request error: {:#}", self.0);
        render(&FolioError::general_error("Internal server error"))
    }
}

fn render(err: &FolioError) -> Response {
    let safe = err.sanitize_for_client();
    let status = StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(safe.to_json())).into_response()
}
