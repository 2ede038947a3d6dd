//! Protocol-level error type with HTTP status code mapping.
//!
//! [`ApiError`] covers only failures that are *not* business outcomes:
//! bad credentials, unparseable input and internal faults. Business
//! declines travel as `200 OK` envelopes carrying a
//! [`crate::domain::Reason`] and never pass through this type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::Reason;
use crate::persistence::StoreError;

/// JSON body of every non-200 response.
///
/// ```json
/// { "ok": false, "reason": "UNAUTHORIZED" }
/// { "ok": false, "error": "Internal server error" }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`.
    pub ok: bool,
    /// Reason code for 4xx responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    /// Generic message for 5xx responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// | Variant        | HTTP Status |
/// |----------------|-------------|
/// | `Unauthorized` | 401         |
/// | `BadRequest`   | 400         |
/// | `Store`        | 500         |
/// | `Internal`     | 500         |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, malformed, expired or forged bearer token.
    #[error("unauthorized")]
    Unauthorized,

    /// Malformed request body or missing required field.
    #[error("bad request: {0}")]
    BadRequest(Reason),

    /// Persistence failure outside of the steps that map to a decline.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Anything else unexpected.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Reason code sent to the client, if the variant exposes one.
    #[must_use]
    pub const fn reason(&self) -> Option<Reason> {
        match self {
            Self::Unauthorized => Some(Reason::Unauthorized),
            Self::BadRequest(reason) => Some(*reason),
            Self::Store(_) | Self::Internal(_) => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self.reason() {
            Some(reason) => ErrorResponse {
                ok: false,
                reason: Some(reason),
                error: None,
            },
            None => {
                tracing::error!(error = %self, "request failed");
                ErrorResponse {
                    ok: false,
                    reason: None,
                    error: Some("Internal server error".to_string()),
                }
            }
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
