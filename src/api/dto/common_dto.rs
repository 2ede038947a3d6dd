//! Response envelope shared by every function endpoint.
//!
//! Both outcomes are `200 OK`:
//!
//! ```json
//! { "ok": true, "booking": { ... } }
//! { "ok": false, "reason": "TIME_CONFLICT" }
//! ```

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Reason, Verdict};

/// Successful envelope; `body`'s fields are inlined next to `ok`.
#[derive(Debug, Serialize)]
pub struct Accepted<T> {
    ok: bool,
    #[serde(flatten)]
    body: T,
}

impl<T> Accepted<T> {
    /// Wraps `body` in an `ok: true` envelope.
    pub const fn new(body: T) -> Self {
        Self { ok: true, body }
    }
}

/// Business decline envelope.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Declined {
    /// Always `false`.
    pub ok: bool,
    /// Decline code.
    pub reason: Reason,
    /// Present on `NOT_COMPLETE` only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watched_percent: Option<i32>,
}

impl Declined {
    /// A decline carrying only its reason.
    #[must_use]
    pub const fn new(reason: Reason) -> Self {
        Self {
            ok: false,
            reason,
            watched_percent: None,
        }
    }
}

impl IntoResponse for Declined {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Renders a verdict as the `200 OK` envelope, mapping the success value
/// into its wire shape.
pub fn envelope<T, B, F>(verdict: Verdict<T>, to_body: F) -> Response
where
    B: Serialize,
    F: FnOnce(T) -> B,
{
    match verdict {
        Ok(value) => Json(Accepted::new(to_body(value))).into_response(),
        Err(reason) => {
            tracing::info!(%reason, "request declined");
            Declined::new(reason).into_response()
        }
    }
}
