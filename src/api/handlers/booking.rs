//! Booking function handlers: create, update, cancel, review.

use axum::Router;
use axum::extract::State;
use axum::response::Response;
use axum::routing::post;

use crate::api::auth::AuthUser;
use crate::api::dto::{
    BookingResponse, CancelBookingRequest, CreateBookingRequest, ReviewBookingRequest,
    UpdateBookingRequest, envelope,
};
use crate::api::extract::{Payload, required};
use crate::app_state::AppState;
use crate::domain::{BookingDraft, BookingPatch, Reason};
use crate::error::{ApiError, ErrorResponse};

/// Trims a title, treating blank input as absent.
fn clean_title(title: Option<String>) -> Option<String> {
    title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// `POST /functions/v1/create-booking` — Request a room.
///
/// # Errors
///
/// Returns [`ApiError`] for authentication, malformed input or store failures.
#[utoipa::path(
    post,
    path = "/functions/v1/create-booking",
    tag = "Bookings",
    summary = "Create a booking",
    description = "Creates a pending booking after validating the time window, lead time, room state, blocks and conflicts.",
    request_body = CreateBookingRequest,
    responses(
        (status = 200, description = "Booking created, or `{ ok: false, reason }` when declined", body = BookingResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Payload(req): Payload<CreateBookingRequest>,
) -> Result<Response, ApiError> {
    let draft = BookingDraft {
        room_id: required(req.room_id, Reason::BadRequest)?,
        title: required(clean_title(req.title), Reason::BadRequest)?,
        description: req.description,
        start: required(req.start_at, Reason::BadRequest)?,
        end: required(req.end_at, Reason::BadRequest)?,
    };
    let verdict = state.bookings.create(auth.user_id, draft).await?;
    Ok(envelope(verdict, BookingResponse::from))
}

/// `POST /functions/v1/update-booking` — Change an existing booking.
///
/// # Errors
///
/// Returns [`ApiError`] for authentication, malformed input or store failures.
#[utoipa::path(
    post,
    path = "/functions/v1/update-booking",
    tag = "Bookings",
    summary = "Update a booking",
    description = "Applies a partial update. Owners must edit at least two hours before the start; admins are exempt.",
    request_body = UpdateBookingRequest,
    responses(
        (status = 200, description = "Booking updated, or a decline envelope", body = BookingResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn update_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Payload(req): Payload<UpdateBookingRequest>,
) -> Result<Response, ApiError> {
    let booking_id = required(req.booking_id, Reason::BadRequest)?;
    let title = req
        .title
        .map(|t| required(clean_title(Some(t)), Reason::BadRequest))
        .transpose()?;
    let patch = BookingPatch {
        title,
        description: req.description,
        start: req.start_at,
        end: req.end_at,
    };
    let verdict = state.bookings.update(auth.user_id, booking_id, patch).await?;
    Ok(envelope(verdict, BookingResponse::from))
}

/// `POST /functions/v1/cancel-booking` — Cancel a booking and refund points.
///
/// # Errors
///
/// Returns [`ApiError`] for authentication, malformed input or store failures.
#[utoipa::path(
    post,
    path = "/functions/v1/cancel-booking",
    tag = "Bookings",
    summary = "Cancel a booking",
    description = "Cancels a pending or approved booking at least one hour before its start (admins exempt) and refunds any points it consumed.",
    request_body = CancelBookingRequest,
    responses(
        (status = 200, description = "Booking cancelled, or a decline envelope", body = BookingResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Payload(req): Payload<CancelBookingRequest>,
) -> Result<Response, ApiError> {
    let booking_id = required(req.booking_id, Reason::BadRequest)?;
    let verdict = state.bookings.cancel(auth.user_id, booking_id).await?;
    Ok(envelope(verdict, BookingResponse::from))
}

/// `POST /functions/v1/review-booking` — Approve or reject a pending booking.
///
/// # Errors
///
/// Returns [`ApiError`] for authentication, malformed input or store failures.
#[utoipa::path(
    post,
    path = "/functions/v1/review-booking",
    tag = "Bookings",
    summary = "Review a booking",
    description = "Admin-only transition of a pending booking to approved or rejected.",
    request_body = ReviewBookingRequest,
    responses(
        (status = 200, description = "Booking reviewed, or a decline envelope", body = BookingResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn review_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Payload(req): Payload<ReviewBookingRequest>,
) -> Result<Response, ApiError> {
    let booking_id = required(req.booking_id, Reason::BadRequest)?;
    let decision = required(req.decision, Reason::BadRequest)?;
    let verdict = state
        .bookings
        .review(auth.user_id, booking_id, decision.into())
        .await?;
    Ok(envelope(verdict, BookingResponse::from))
}

/// Booking function routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create-booking", post(create_booking))
        .route("/update-booking", post(update_booking))
        .route("/cancel-booking", post(cancel_booking))
        .route("/review-booking", post(review_booking))
}
