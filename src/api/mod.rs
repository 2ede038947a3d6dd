//! HTTP layer: route handlers, DTOs, extractors and router composition.
//!
//! Function endpoints live under `/functions/v1`, resource endpoints under
//! `/api/v1` and the health check at the root.

pub mod auth;
pub mod cors;
pub mod dto;
pub mod extract;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for every endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "roomly", description = "Room booking and learning rewards functions"),
    paths(
        handlers::booking::create_booking,
        handlers::booking::update_booking,
        handlers::booking::cancel_booking,
        handlers::booking::review_booking,
        handlers::rewards::complete_episode,
        handlers::rewards::my_rewards,
        handlers::system::health_handler,
    ),
    components(schemas(
        dto::CreateBookingRequest,
        dto::UpdateBookingRequest,
        dto::CancelBookingRequest,
        dto::ReviewBookingRequest,
        dto::ReviewDecisionDto,
        dto::BookingDto,
        dto::BookingResponse,
        dto::CompleteEpisodeRequest,
        dto::CompleteEpisodeResponse,
        dto::RewardsResponse,
        dto::Declined,
        crate::error::ErrorResponse,
        crate::domain::Reason,
    )),
    tags(
        (name = "Bookings", description = "Room booking lifecycle"),
        (name = "Rewards", description = "Episode completion, points and streaks"),
        (name = "System", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;

/// Builds the routing table without middleware.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/functions/v1", handlers::function_routes())
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

/// Builds the complete application: routes, state and middleware stack.
///
/// The preflight middleware is outermost so `OPTIONS` never reaches
/// routing or the permissive CORS layer.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    build_router()
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(cors::preflight))
        .with_state(state)
}
