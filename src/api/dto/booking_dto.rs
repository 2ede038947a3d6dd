//! Booking request/response bodies.
//!
//! Every request field is optional at the serde level so a missing field
//! becomes `BAD_REQUEST` in the service envelope rather than a raw
//! deserialisation error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Booking, BookingId, BookingStatus, RoomId, UserId};
use crate::service::ReviewDecision;

/// Body of `create-booking`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// Room to book.
    pub room_id: Option<RoomId>,
    /// Meeting title.
    pub title: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Inclusive start (RFC 3339).
    pub start_at: Option<DateTime<Utc>>,
    /// Exclusive end (RFC 3339).
    pub end_at: Option<DateTime<Utc>>,
}

/// Body of `update-booking`; absent fields keep their stored value.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    /// Booking to change.
    pub booking_id: Option<BookingId>,
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New start.
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    /// New end.
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
}

/// Body of `cancel-booking`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelBookingRequest {
    /// Booking to cancel.
    pub booking_id: Option<BookingId>,
}

/// Review decision as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecisionDto {
    /// Approve.
    Approved,
    /// Reject.
    Rejected,
}

impl From<ReviewDecisionDto> for ReviewDecision {
    fn from(dto: ReviewDecisionDto) -> Self {
        match dto {
            ReviewDecisionDto::Approved => Self::Approve,
            ReviewDecisionDto::Rejected => Self::Reject,
        }
    }
}

/// Body of `review-booking`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewBookingRequest {
    /// Booking to review.
    pub booking_id: Option<BookingId>,
    /// `approved` or `rejected`.
    pub decision: Option<ReviewDecisionDto>,
}

/// Wire representation of a booking.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingDto {
    /// Booking id.
    pub id: BookingId,
    /// Booked room.
    pub room_id: RoomId,
    /// Owner.
    pub user_id: UserId,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Start.
    pub start_at: DateTime<Utc>,
    /// End.
    pub end_at: DateTime<Utc>,
    /// Lifecycle status.
    pub status: BookingStatus,
    /// Points consumed by the booking, if any.
    pub points_used: Option<i64>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingDto {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            room_id: b.room_id,
            user_id: b.user_id,
            title: b.title,
            description: b.description,
            start_at: b.range.start(),
            end_at: b.range.end(),
            status: b.status,
            points_used: b.points_used,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

/// Success body of every booking endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingResponse {
    /// Stored booking after the operation.
    pub booking: BookingDto,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            booking: booking.into(),
        }
    }
}
