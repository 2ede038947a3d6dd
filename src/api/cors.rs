//! CORS preflight handling.
//!
//! Browser clients preflight every function call. `CorsLayer` answers those
//! with `200`; callers of the function endpoints expect `204` with a fixed
//! header set, so preflights are short-circuited here before routing.

use axum::extract::Request;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Methods advertised to preflight requests.
pub const ALLOWED_METHODS: &str = "POST, GET, OPTIONS";

/// Request headers advertised to preflight requests.
pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Middleware answering every `OPTIONS` request with `204 No Content`.
pub async fn preflight(req: Request, next: Next) -> Response {
    if req.method() != Method::OPTIONS {
        return next.run(req).await;
    }
    (
        StatusCode::NO_CONTENT,
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS),
            (ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS),
        ],
    )
        .into_response()
}
