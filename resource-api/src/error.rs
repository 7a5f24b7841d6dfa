//! Error types and error document conversion
//!
//! Two families live here:
//!
//! - [`ApiError`] is raised while serving a request. Every kind renders as an
//!   error document (`{"@type": "error", "error_type": ..., "error_message": ...}`)
//!   with a matching status code.
//! - [`Error`] covers process start-up (configuration, I/O) and never reaches a caller.
//!
//! # Example
//!
//! ```rust
//! use resource_api::error::{ApiError, ApiErrorKind};
//!
//! let error = ApiError::entity_missing("repository");
//! assert!(error.is_entity_missing());
//! assert_eq!(error.kind.error_type(), "not_found");
//! assert_eq!(error.message, "repository not found (or insufficient access)");
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

/// Fixed message for include tokens that are not `<type>.<field>`
pub const ILLEGAL_INCLUDE_FORMAT: &str = "illegal format for include parameter";

/// Why a lookup ended in "not found"
///
/// Only visible internally (tests, logs). Both causes render identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotFoundCause {
    /// The object does not exist
    TrueAbsence,
    /// The object exists but the caller may not see it
    AccessDenied,
}

impl fmt::Display for NotFoundCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrueAbsence => write!(f, "entity_missing"),
            Self::AccessDenied => write!(f, "access_denied"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Object missing or invisible to the caller
    NotFound(NotFoundCause),
    /// The action needs an authenticated subject
    LoginRequired,
    /// Malformed request parameters
    WrongParams,
    /// The service does not support this operation
    NotImplemented,
    /// Failure in a collaborator (persistence)
    InternalError,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.error_type())
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::LoginRequired => StatusCode::UNAUTHORIZED,
            Self::WrongParams => StatusCode::BAD_REQUEST,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The `error_type` value of the error document
    ///
    /// Both not-found causes share one code.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::LoginRequired => "login_required",
            Self::WrongParams => "wrong_params",
            Self::NotImplemented => "not_implemented",
            Self::InternalError => "internal_error",
        }
    }
}

/// Structured API error
///
/// # Example
///
/// ```rust
/// use resource_api::error::ApiError;
///
/// let hidden = ApiError::not_found("repository");
/// let missing = ApiError::entity_missing("repository");
///
/// // callers cannot tell the two apart
/// assert_eq!(hidden.to_document(), missing.to_document());
/// assert_ne!(hidden.is_entity_missing(), missing.is_entity_missing());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The category of error
    pub kind: ApiErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Resource type involved, only reported for not-found errors
    pub resource_type: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            resource_type: None,
        }
    }

    /// Not found with an explicit cause
    pub fn not_found_because(cause: NotFoundCause, resource_type: impl Into<String>) -> Self {
        let resource_type = resource_type.into();
        Self {
            kind: ApiErrorKind::NotFound(cause),
            message: format!("{} not found (or insufficient access)", resource_type),
            resource_type: Some(resource_type),
        }
    }

    /// The object exists, but the caller is not allowed to see it
    pub fn not_found(resource_type: impl Into<String>) -> Self {
        Self::not_found_because(NotFoundCause::AccessDenied, resource_type)
    }

    /// The object does not exist at all
    pub fn entity_missing(resource_type: impl Into<String>) -> Self {
        Self::not_found_because(NotFoundCause::TrueAbsence, resource_type)
    }

    /// Authentication required
    pub fn login_required() -> Self {
        Self::new(ApiErrorKind::LoginRequired, "login required")
    }

    /// Malformed request parameters
    pub fn wrong_params(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::WrongParams, message)
    }

    /// An include token that is not exactly `<type>.<field>`
    pub fn illegal_include_format() -> Self {
        Self::wrong_params(ILLEGAL_INCLUDE_FORMAT)
    }

    /// An include token naming a field the resource type does not declare
    pub fn unknown_include_field(path: &str) -> Self {
        Self::wrong_params(format!("no field \"{}\" to include", path))
    }

    /// Operation not supported
    pub fn not_implemented() -> Self {
        Self::new(ApiErrorKind::NotImplemented, "request not (yet) implemented")
    }

    /// Internal failure; the message is logged but never rendered
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InternalError, message)
    }

    /// Check for either not-found cause
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ApiErrorKind::NotFound(_))
    }

    /// Check for the true-absence cause
    #[must_use]
    pub fn is_entity_missing(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::NotFound(NotFoundCause::TrueAbsence)
        )
    }

    /// The document sent to the caller
    #[must_use]
    pub fn to_document(&self) -> ErrorDocument {
        let error_message = match self.kind {
            ApiErrorKind::InternalError => "an internal error occurred".to_string(),
            _ => self.message.clone(),
        };
        ErrorDocument {
            kind: "error".to_string(),
            error_type: self.kind.error_type().to_string(),
            error_message,
            resource_type: self.resource_type.clone(),
        }
    }

    pub(crate) fn log(&self) {
        match self.kind {
            ApiErrorKind::InternalError => {
                tracing::error!(kind = %self.kind, "API error: {}", self.message);
            }
            ApiErrorKind::NotFound(cause) => {
                tracing::debug!(
                    cause = %cause,
                    resource_type = ?self.resource_type,
                    "resource not found"
                );
            }
            _ => tracing::debug!(kind = %self.kind, "API error: {}", self.message),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API {} error: {}", self.kind, self.message)?;
        if let ApiErrorKind::NotFound(cause) = self.kind {
            write!(f, " [{}]", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::internal(err.to_string())
    }
}

/// Response body for API errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDocument {
    /// Always `"error"`
    #[serde(rename = "@type")]
    pub kind: String,
    /// Machine-readable error code
    pub error_type: String,
    /// Human-readable message
    pub error_message: String,
    /// Only present for not-found errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        (self.kind.status_code(), Json(self.to_document())).into_response()
    }
}

/// Result type for request handling
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Start-up errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid resource or service declarations
    #[error("Invalid declaration: {0}")]
    Declaration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

/// Result type alias for start-up operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_causes_render_identically() {
        let hidden = serde_json::to_string(&ApiError::not_found("repository").to_document())
            .unwrap();
        let missing =
            serde_json::to_string(&ApiError::entity_missing("repository").to_document()).unwrap();
        assert_eq!(hidden, missing);
        assert_eq!(
            hidden,
            r#"{"@type":"error","error_type":"not_found","error_message":"repository not found (or insufficient access)","resource_type":"repository"}"#
        );
    }

    #[test]
    fn test_entity_missing_discriminant() {
        assert!(ApiError::entity_missing("job").is_entity_missing());
        assert!(!ApiError::not_found("job").is_entity_missing());
        assert!(ApiError::not_found("job").is_not_found());
        assert_eq!(
            ApiError::entity_missing("job").kind.status_code(),
            ApiError::not_found("job").kind.status_code()
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::not_found("x").kind.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::login_required().kind.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::illegal_include_format().kind.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_implemented().kind.status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            ApiError::internal("boom").kind.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_wrong_params_document_has_no_resource_type() {
        let doc = serde_json::to_value(
            ApiError::unknown_include_field("repository.last_build_number").to_document(),
        )
        .unwrap();
        assert_eq!(
            doc,
            serde_json::json!({
                "@type": "error",
                "error_type": "wrong_params",
                "error_message": "no field \"repository.last_build_number\" to include"
            })
        );
    }

    #[test]
    fn test_internal_message_not_exposed() {
        let doc = ApiError::internal("connection refused to 10.0.0.1").to_document();
        assert_eq!(doc.error_message, "an internal error occurred");
        assert_eq!(doc.error_type, "internal_error");
    }

    #[test]
    fn test_display() {
        let display = ApiError::entity_missing("build").to_string();
        assert!(display.contains("not_found"));
        assert!(display.contains("entity_missing"));
    }

    #[test]
    fn test_store_error_conversion() {
        let err: ApiError = StoreError::unavailable("build", "pool exhausted").into();
        assert_eq!(err.kind, ApiErrorKind::InternalError);
    }
}
