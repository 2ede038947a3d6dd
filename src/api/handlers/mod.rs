//! Endpoint handlers organized by resource.

pub mod booking;
pub mod rewards;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Function-style endpoints mounted under `/functions/v1`.
pub fn function_routes() -> Router<AppState> {
    Router::new()
        .merge(booking::routes())
        .merge(rewards::function_routes())
}

/// Resource endpoints mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().merge(rewards::routes())
}
