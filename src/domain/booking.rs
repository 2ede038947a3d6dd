//! Rooms, blocks, bookings and the time-window rules that govern them.
//!
//! Every interval is half-open, `[start, end)`: a booking ending at 11:00
//! does not collide with one starting at 11:00.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::clock::BusinessCalendar;
use super::ids::{BookingId, RoomId, UserId};
use super::reason::{Reason, Verdict};

/// Bookings must start on or after this many calendar days from today.
pub const MIN_LEAD_DAYS: i64 = 7;

/// Owners may edit a booking until this many hours before it starts.
pub const EDIT_CUTOFF_HOURS: i64 = 2;

/// Owners may cancel a booking until this many hours before it starts.
pub const CANCEL_CUTOFF_HOURS: i64 = 1;

/// Half-open time interval with `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Builds a range, declining with [`Reason::InvalidTime`] unless `end > start`.
    ///
    /// # Errors
    ///
    /// Returns [`Reason::InvalidTime`] when `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Verdict<Self> {
        if end <= start {
            return Err(Reason::InvalidTime);
        }
        Ok(Self { start, end })
    }

    /// Inclusive start.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Half-open intersection test: `a.start < b.end && a.end > b.start`.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Whether a room can currently be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Room accepts bookings.
    Active,
    /// Room is closed to new bookings.
    Inactive,
}

impl RoomStatus {
    /// Database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl FromStr for RoomStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Anything other than `active` is treated as unavailable.
        Ok(if s == "active" {
            Self::Active
        } else {
            Self::Inactive
        })
    }
}

/// A meeting room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Room identifier.
    pub id: RoomId,
    /// Display name.
    pub name: String,
    /// Availability.
    pub status: RoomStatus,
}

/// Administrative unavailability window on a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomBlock {
    /// Block row identifier.
    pub id: uuid::Uuid,
    /// Blocked room.
    pub room_id: RoomId,
    /// Blocked interval.
    pub range: TimeRange,
    /// Optional human-readable reason.
    pub reason: Option<String>,
}

/// Booking lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Awaiting admin review.
    Pending,
    /// Confirmed by an admin.
    Approved,
    /// Declined by an admin.
    Rejected,
    /// Withdrawn by the owner or an admin.
    Cancelled,
}

impl BookingStatus {
    /// Statuses that occupy their time slot.
    pub const OCCUPYING: [Self; 2] = [Self::Pending, Self::Approved];

    /// Database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// `true` for pending and approved bookings, which block other requests.
    #[must_use]
    pub const fn occupies_slot(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a database string that maps to no known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);

impl FromStr for BookingStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// A stored room booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    /// Booking identifier.
    pub id: BookingId,
    /// Booked room.
    pub room_id: RoomId,
    /// Owner.
    pub user_id: UserId,
    /// Meeting title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Booked interval.
    pub range: TimeRange,
    /// Lifecycle state.
    pub status: BookingStatus,
    /// Points consumed when the booking was made, refunded on cancellation.
    pub points_used: Option<i64>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last modification instant.
    pub updated_at: DateTime<Utc>,
}

/// Fields for a booking about to be inserted (always `pending`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    /// Booked room.
    pub room_id: RoomId,
    /// Owner.
    pub user_id: UserId,
    /// Meeting title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Requested interval.
    pub range: TimeRange,
}

/// A booking request as submitted by a learner, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDraft {
    /// Requested room.
    pub room_id: RoomId,
    /// Meeting title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Requested start.
    pub start: DateTime<Utc>,
    /// Requested end.
    pub end: DateTime<Utc>,
}

/// Caller-supplied changes to an existing booking; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New start.
    pub start: Option<DateTime<Utc>>,
    /// New end.
    pub end: Option<DateTime<Utc>>,
}

impl BookingPatch {
    /// `true` when either bound of the interval is being changed.
    #[must_use]
    pub const fn touches_time(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

/// Checks a requested window against the clock.
///
/// Order matters: an inverted range is reported before a past start, and a
/// past start before the lead-time rule.
///
/// # Errors
///
/// [`Reason::InvalidTime`], [`Reason::CannotBookPast`] or [`Reason::TooSoon`].
pub fn check_new_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
    calendar: &BusinessCalendar,
) -> Verdict<TimeRange> {
    let range = TimeRange::new(start, end)?;
    if range.start() < now {
        return Err(Reason::CannotBookPast);
    }
    if !meets_lead_time(range.start(), now, calendar) {
        return Err(Reason::TooSoon);
    }
    Ok(range)
}

/// Date-only lead-time rule: the start date must be at least
/// [`MIN_LEAD_DAYS`] after today's date. Time of day is ignored.
#[must_use]
pub fn meets_lead_time(start: DateTime<Utc>, now: DateTime<Utc>, calendar: &BusinessCalendar) -> bool {
    let today = calendar.date_of(now);
    let start_day = calendar.date_of(start);
    (start_day - today).num_days() >= MIN_LEAD_DAYS
}

/// `true` while `now` is at least `cutoff_hours` before `start`.
#[must_use]
pub fn before_cutoff(start: DateTime<Utc>, now: DateTime<Utc>, cutoff_hours: i64) -> bool {
    start - now >= Duration::hours(cutoff_hours)
}
