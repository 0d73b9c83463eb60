//! # Errors
//!
//! Folio uses one structured error type for everything that can reach a
//! client. Core goals:
//! - a stable status code + class name per failure kind
//! - can be carried through `anyhow::Error` (any layer may add context)
//! - transport-agnostic (the HTTP adapter decides how to serialize)
//!
//! Only a handful of kinds exist on purpose. Tenant lookups never fail a
//! request and license problems degrade to the community level, so neither
//! has a kind of its own.

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::Value;

/// A convenience result type for Folio core APIs.
pub type FolioResult<T> = std::result::Result<T, AnyError>;

/// Error class names + status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,      // 400
    Forbidden,       // 403
    Conflict,        // 409
    TooManyRequests, // 429
    GeneralError,    // 500
    Unavailable,     // 503
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::Conflict => 409,
            ErrorKind::TooManyRequests => 429,
            ErrorKind::GeneralError => 500,
            ErrorKind::Unavailable => 503,
        }
    }

    /// Error `name` (e.g. "TooManyRequests")
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::TooManyRequests => "TooManyRequests",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::Unavailable => "Unavailable",
        }
    }

    /// Error `className` (kebab-cased)
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::TooManyRequests => "too-many-requests",
            ErrorKind::GeneralError => "general-error",
            ErrorKind::Unavailable => "unavailable",
        }
    }
}

/// A structured Folio error that can live inside `anyhow::Error`.
///
/// Serialized fields:
/// - name
/// - message
/// - code (HTTP status)
/// - className
/// - data (optional)
#[derive(Debug)]
pub struct FolioError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
    pub source: Option<AnyError>,
}

impl FolioError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find a `FolioError` anywhere in an `anyhow` chain.
    pub fn find_in(err: &AnyError) -> Option<&FolioError> {
        err.chain().find_map(|e| e.downcast_ref::<FolioError>())
    }

    /// Copy suitable for returning to clients: the inner `source` is dropped.
    pub fn sanitize_for_client(&self) -> FolioError {
        FolioError {
            kind: self.kind,
            message: self.message.clone(),
            data: self.data.clone(),
            source: None,
        }
    }

    pub fn to_json(&self) -> Value {
        use serde_json::json;

        let mut base = json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });

        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        base
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }
    pub fn too_many_requests(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::TooManyRequests, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }
}

impl fmt::Display for FolioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for FolioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kinds_map_to_status_and_class_name() {
        let quota = FolioError::too_many_requests("Quota exceeded");
        assert_eq!(quota.code(), 429);
        assert_eq!(quota.class_name(), "too-many-requests");

        let busy = FolioError::unavailable("busy");
        assert_eq!((busy.code(), busy.name()), (503, "Unavailable"));
        assert_eq!(FolioError::conflict("dup").code(), 409);
    }

    #[test]
    fn find_in_sees_through_context() {
        let err = FolioError::forbidden("admin only")
            .into_anyhow()
            .context("while resetting metrics");
        let found = FolioError::find_in(&err).unwrap();
        assert_eq!(found.kind, ErrorKind::Forbidden);
    }

    #[test]
    fn json_shape_omits_source_and_empty_fields() {
        let err = FolioError::too_many_requests("Quota exceeded")
            .with_data(json!({"limit": 3, "attempted": 4}))
            .with_source(anyhow::anyhow!("secret detail"));
        let body = err.sanitize_for_client().to_json();

        assert_eq!(body["name"], "TooManyRequests");
        assert_eq!(body["className"], "too-many-requests");
        assert_eq!(body["data"]["limit"], 3);
        assert!(!body.to_string().contains("secret detail"));

        let bare = FolioError::forbidden("admin only").to_json();
        assert!(bare.get("data").is_none());
    }
}
