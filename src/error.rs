//! Error types for the pdf2csv-proxy library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`OperationError`] — **Per request**: a single upload could not be turned
//!   into CSV artifacts. It is the only error shape a caller of
//!   `POST /api/process-pdf` ever sees, rendered as
//!   `{ "statusCode": <u16>, "message": <string> }`.
//!
//! * [`ConfigError`] — **Startup**: the proxy cannot be constructed at all
//!   (bad upstream URL, zero timeout). Returned from
//!   [`crate::config::ProxyConfigBuilder::build`] and
//!   [`crate::proxy::ConversionProxy::new`].
//!
//! ## Classification
//!
//! Every per-request failure is classified exactly once, where it is
//! detected, and the first matching rule wins:
//!
//! | Failure | Kind | Status |
//! |---------|------|--------|
//! | missing, empty or unreadable upload | [`ErrorKind::Validation`] | 400 |
//! | contacting or interpreting the conversion service | [`ErrorKind::Upstream`] | 502 |
//! | anything else | [`ErrorKind::Internal`] | 500 |
//!
//! The `From` conversions below encode the table for the foreign error types
//! that can reach a handler, so `?` always lands in the right bucket.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Message surfaced for [`OperationError::Internal`] when nothing more
/// specific is known.
pub const INTERNAL_FALLBACK_MESSAGE: &str = "Internal server error";

/// Boxed cause kept alongside a classified error for logging.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The three kinds of request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller-side defect: missing or empty document, malformed body.
    Validation,
    /// The conversion service was unreachable or reported a failure.
    Upstream,
    /// Anything unanticipated inside this layer.
    Internal,
}

impl ErrorKind {
    /// HTTP status a failure of this kind is reported with.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A classified per-request failure.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The inbound request did not carry a usable document.
    #[error("{message}")]
    Validation { message: String },

    /// Talking to the conversion service failed, or its reply was unusable.
    #[error("Failed to communicate with PDF processing service: {reason}")]
    Upstream {
        reason: String,
        #[source]
        cause: Option<BoxError>,
    },

    /// Unexpected failure in this layer.
    #[error("{}", .message.as_deref().unwrap_or(INTERNAL_FALLBACK_MESSAGE))]
    Internal {
        message: Option<String>,
        #[source]
        cause: Option<BoxError>,
    },
}

impl OperationError {
    pub fn validation(message: impl Into<String>) -> Self {
        OperationError::Validation {
            message: message.into(),
        }
    }

    pub fn upstream(reason: impl Into<String>) -> Self {
        OperationError::Upstream {
            reason: reason.into(),
            cause: None,
        }
    }

    /// Upstream failure that keeps the underlying error as its source.
    pub fn upstream_with_cause(
        reason: impl Into<String>,
        cause: impl Into<BoxError>,
    ) -> Self {
        OperationError::Upstream {
            reason: reason.into(),
            cause: Some(cause.into()),
        }
    }

    /// Internal failure. `None` yields [`INTERNAL_FALLBACK_MESSAGE`].
    pub fn internal(message: Option<String>) -> Self {
        OperationError::Internal {
            message,
            cause: None,
        }
    }

    pub fn internal_with_cause(message: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        OperationError::Internal {
            message: Some(message.into()),
            cause: Some(cause.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OperationError::Validation { .. } => ErrorKind::Validation,
            OperationError::Upstream { .. } => ErrorKind::Upstream,
            OperationError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }

    /// The JSON body this error is rendered as.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status_code: self.status().as_u16(),
            message: self.to_string(),
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
}

impl IntoResponse for OperationError {
    fn into_response(self) -> Response {
        match self.kind() {
            ErrorKind::Validation => {
                tracing::debug!(error = %self, kind = "validation", "Request rejected");
            }
            ErrorKind::Upstream => {
                tracing::warn!(error = %self, kind = "upstream", "Conversion service failure");
            }
            ErrorKind::Internal => {
                tracing::error!(error = %self, cause = ?std::error::Error::source(&self), kind = "internal", "Internal failure");
            }
        }
        (self.status(), Json(self.body())).into_response()
    }
}

// ── Classification of foreign errors ─────────────────────────────────────

impl From<MultipartRejection> for OperationError {
    fn from(rejection: MultipartRejection) -> Self {
        OperationError::validation(format!("Invalid upload: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for OperationError {
    fn from(err: MultipartError) -> Self {
        OperationError::validation(format!("Failed to read upload: {}", err.body_text()))
    }
}

impl From<JsonRejection> for OperationError {
    fn from(rejection: JsonRejection) -> Self {
        OperationError::validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// Startup errors: the proxy cannot be built from the given configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Upstream base URL is not an absolute http(s) URL.
    #[error("Invalid upstream URL '{url}': {reason}")]
    InvalidUpstreamUrl { url: String, reason: String },

    /// A numeric setting is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The HTTP client could not be constructed (TLS backend, etc.).
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_fixed_statuses() {
        assert_eq!(ErrorKind::Validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::Upstream.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorKind::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_message_is_verbatim() {
        let e = OperationError::validation("No PDF file uploaded");
        assert_eq!(e.to_string(), "No PDF file uploaded");
        assert_eq!(
            e.body(),
            ErrorBody {
                status_code: 400,
                message: "No PDF file uploaded".into()
            }
        );
    }

    #[test]
    fn upstream_message_embeds_reason() {
        let e = OperationError::upstream("connection refused");
        let body = e.body();
        assert_eq!(body.status_code, 502);
        assert!(body.message.contains("PDF processing service"), "got: {}", body.message);
        assert!(body.message.contains("connection refused"), "got: {}", body.message);
    }

    #[test]
    fn internal_without_message_uses_fallback() {
        let e = OperationError::internal(None);
        assert_eq!(e.kind(), ErrorKind::Internal);
        assert_eq!(e.body().message, "Internal server error");
        assert_eq!(e.body().status_code, 500);
    }

    #[test]
    fn internal_keeps_specific_message_and_cause() {
        let io = std::io::Error::other("disk on fire");
        let e = OperationError::internal_with_cause("could not stage upload", io);
        assert_eq!(e.to_string(), "could not stage upload");
        let source = std::error::Error::source(&e).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("disk on fire"));
    }

    #[test]
    fn error_body_uses_camel_case() {
        let json = serde_json::to_value(OperationError::upstream("boom").body()).unwrap();
        assert_eq!(json["statusCode"], 502);
        assert!(json.get("status_code").is_none());
    }

    #[test]
    fn config_error_display() {
        let e = ConfigError::InvalidUpstreamUrl {
            url: "ftp://x".into(),
            reason: "scheme must be http or https".into(),
        };
        assert!(e.to_string().contains("ftp://x"));
    }
}
