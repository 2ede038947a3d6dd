//! Closed set of reason codes returned to callers.
//!
//! The codes are part of the wire contract with the front end and are
//! serialized verbatim (`SCREAMING_SNAKE_CASE`). Protocol-level codes
//! (`UNAUTHORIZED`, `BAD_REQUEST`, `MISSING_EPISODE_ID`) travel with a 4xx
//! status; every other code is a business decline sent with `200 OK`.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Every reason code the service can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    /// Missing, malformed or expired bearer token.
    Unauthorized,
    /// Body is not valid JSON or lacks required fields.
    BadRequest,
    /// `end` is not strictly after `start`.
    InvalidTime,
    /// Requested start lies in the past.
    CannotBookPast,
    /// Requested date is less than the minimum lead time away.
    TooSoon,
    /// Caller's profile is missing or deactivated.
    UserInactive,
    /// Room does not exist.
    RoomNotFound,
    /// Room exists but is not bookable.
    RoomNotActive,
    /// Requested interval intersects an administrative block.
    Blocked,
    /// Requested interval intersects a pending or approved booking.
    TimeConflict,
    /// Booking row could not be written.
    InsertFail,
    /// Booking does not exist.
    BookingNotFound,
    /// Caller is neither the booking owner nor an admin.
    NotOwner,
    /// Edit window before the start time has closed.
    TooLateToEdit,
    /// Cancellation window before the start time has closed.
    TooLateToCancel,
    /// Booking is cancelled or rejected (or otherwise not in a modifiable state).
    BookingNotActive,
    /// Booking was already cancelled.
    AlreadyCancelled,
    /// Booking update could not be written.
    UpdateFail,
    /// Booking cancellation could not be written.
    CancelFail,
    /// `episodeId` absent from the request.
    MissingEpisodeId,
    /// Episode does not exist.
    EpisodeNotFound,
    /// Episode progress does not satisfy the completion predicate yet.
    NotComplete,
}

impl Reason {
    /// Returns the wire representation of this code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest => "BAD_REQUEST",
            Self::InvalidTime => "INVALID_TIME",
            Self::CannotBookPast => "CANNOT_BOOK_PAST",
            Self::TooSoon => "TOO_SOON",
            Self::UserInactive => "USER_INACTIVE",
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::RoomNotActive => "ROOM_NOT_ACTIVE",
            Self::Blocked => "BLOCKED",
            Self::TimeConflict => "TIME_CONFLICT",
            Self::InsertFail => "INSERT_FAIL",
            Self::BookingNotFound => "BOOKING_NOT_FOUND",
            Self::NotOwner => "NOT_OWNER",
            Self::TooLateToEdit => "TOO_LATE_TO_EDIT",
            Self::TooLateToCancel => "TOO_LATE_TO_CANCEL",
            Self::BookingNotActive => "BOOKING_NOT_ACTIVE",
            Self::AlreadyCancelled => "ALREADY_CANCELLED",
            Self::UpdateFail => "UPDATE_FAIL",
            Self::CancelFail => "CANCEL_FAIL",
            Self::MissingEpisodeId => "MISSING_EPISODE_ID",
            Self::EpisodeNotFound => "EPISODE_NOT_FOUND",
            Self::NotComplete => "NOT_COMPLETE",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a business operation: either the value or the reason it was declined.
pub type Verdict<T> = Result<T, Reason>;
