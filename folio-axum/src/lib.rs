//! folio-axum: Axum adapter for Folio.
//!
//! Wires tenant resolution, the request-scoped tenant context, the quota
//! gate and usage metrics into an axum `Router`, and mounts the admin and
//! tenant usage endpoints.

pub mod admin;
pub mod app;
pub mod middlewares;
pub mod signals;
pub mod state;
mod error;

pub use admin::{AdminAuthorizer, AdminToken};
pub use app::FolioApp;
pub use error::FolioAxumError;
pub use middlewares::{
    FilesProcessed, QuotaGateLayer, QuotaGateSettings, TenantContextLayer, UsageMetricsLayer,
};
pub use signals::request_signals;
pub use state::FolioState;

pub use axum;
