//! Episode completion and rewards handlers.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::auth::AuthUser;
use crate::api::dto::{
    Accepted, CompleteEpisodeRequest, CompleteEpisodeResponse, Declined, RewardsResponse,
};
use crate::api::extract::{Payload, required};
use crate::app_state::AppState;
use crate::domain::Reason;
use crate::error::{ApiError, ErrorResponse};
use crate::service::Completion;

/// `POST /functions/v1/complete-episode` — Record completion and award points.
///
/// # Errors
///
/// Returns [`ApiError`] for authentication, a missing `episodeId` or store
/// failures.
#[utoipa::path(
    post,
    path = "/functions/v1/complete-episode",
    tag = "Rewards",
    summary = "Complete an episode",
    description = "Awards episode, subject-completion and streak points idempotently. Below 90% watched the call is declined with NOT_COMPLETE and the current percentage.",
    request_body = CompleteEpisodeRequest,
    responses(
        (status = 200, description = "Completion recorded, or a decline envelope", body = CompleteEpisodeResponse),
        (status = 400, description = "Missing episodeId or malformed body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn complete_episode(
    State(state): State<AppState>,
    auth: AuthUser,
    Payload(req): Payload<CompleteEpisodeRequest>,
) -> Result<Response, ApiError> {
    let episode_id = required(req.episode_id, Reason::MissingEpisodeId)?;
    let response = match state
        .rewards
        .complete_episode(auth.user_id, episode_id)
        .await?
    {
        Ok(Completion::Completed(summary)) => {
            Json(Accepted::new(CompleteEpisodeResponse::from(summary))).into_response()
        }
        Ok(Completion::NotComplete { watched_percent }) => Declined {
            watched_percent: Some(watched_percent),
            ..Declined::new(Reason::NotComplete)
        }
        .into_response(),
        Err(reason) => {
            tracing::info!(%reason, user_id = %auth.user_id, %episode_id, "completion declined");
            Declined::new(reason).into_response()
        }
    };
    Ok(response)
}

/// `GET /api/v1/me/rewards` — Caller's wallet and streak.
///
/// # Errors
///
/// Returns [`ApiError`] for authentication or store failures.
#[utoipa::path(
    get,
    path = "/api/v1/me/rewards",
    tag = "Rewards",
    summary = "Rewards summary",
    description = "Returns the caller's point balance, level and streak counters.",
    responses(
        (status = 200, description = "Rewards summary", body = RewardsResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn my_rewards(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Response, ApiError> {
    let summary = state.rewards.summary(auth.user_id).await?;
    Ok(Json(Accepted::new(RewardsResponse::from(summary))).into_response())
}

/// Completion function route.
pub fn function_routes() -> Router<AppState> {
    Router::new().route("/complete-episode", post(complete_episode))
}

/// Rewards resource routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/me/rewards", get(my_rewards))
}
