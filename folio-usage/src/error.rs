use chrono::NaiveDate;
use folio_core::{FolioError, TenantId};
use serde_json::json;
use thiserror::Error;

/// Result type for usage accounting operations
pub type UsageResult<T> = Result<T, UsageError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// Expected business rejection; nothing was written.
    #[error("Monthly operation quota exceeded: limit {limit}, attempted {attempted}")]
    QuotaExceeded { limit: u64, attempted: u64 },

    #[error("Usage window {window_start} for tenant {tenant_id} is busy (waited {waited_ms} ms)")]
    LockContention {
        tenant_id: TenantId,
        window_start: NaiveDate,
        waited_ms: u64,
    },

    #[error("Usage store error: {0}")]
    Store(String),
}

impl UsageError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

impl From<UsageError> for FolioError {
    fn from(err: UsageError) -> Self {
        match err {
            UsageError::QuotaExceeded { limit, attempted } => {
                FolioError::too_many_requests("Quota exceeded")
                    .with_data(json!({ "limit": limit, "attempted": attempted }))
            }
            busy @ UsageError::LockContention { .. } => {
                FolioError::unavailable("Usage accounting is busy, retry shortly")
                    .with_source(anyhow::Error::new(busy))
            }
            store @ UsageError::Store(_) => FolioError::general_error("Usage accounting failed")
                .with_source(anyhow::Error::new(store)),
        }
    }
}
