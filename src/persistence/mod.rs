//! Persistence layer: the [`Store`] trait and its implementations.
//!
//! The relational store is the only shared state and the only
//! synchronisation point between requests. Two guarantees are pushed down
//! to it rather than enforced in application code:
//!
//! - at most one ledger row per [`AwardKey`], written together with the
//!   wallet credit it implies ([`Store::award_points`]);
//! - no two pending/approved bookings overlapping on a room
//!   ([`Store::insert_booking`] and [`Store::update_booking`] report
//!   [`BookingWrite::Overlaps`] instead of writing);
//! - booking rewrites only apply to the status they were computed from
//!   ([`BookingWrite::StatusChanged`] otherwise).
//!
//! [`postgres::PostgresStore`] backs production; [`memory::MemoryStore`]
//! provides identical semantics under a single lock for tests and local runs.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AwardKey, AwardOutcome, Booking, BookingId, BookingStatus, Episode, EpisodeId,
    EpisodeProgress, NewBooking, PointRule, Profile, Room, RoomBlock, RoomId, RuleKey, SubjectId,
    SubjectCompletion, TimeRange, UserId, UserStreak, Wallet,
};

/// Failures raised by a [`Store`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Driver-level failure (connection, query, constraint other than the expected ones).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be mapped onto the domain model.
    #[error("corrupt {entity} row: {detail}")]
    Corrupt {
        /// Table or entity name.
        entity: &'static str,
        /// What was wrong.
        detail: String,
    },

    /// The store is not reachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a booking write guarded by the overlap invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingWrite {
    /// Row written; the stored booking is returned.
    Written(Booking),
    /// Another pending/approved booking already occupies part of the interval.
    Overlaps,
    /// The target row no longer exists (updates only).
    Missing,
    /// The stored status is no longer the expected one (updates only).
    StatusChanged,
}

/// Full replacement values for a booking update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingChanges {
    /// Title to store.
    pub title: String,
    /// Description to store.
    pub description: Option<String>,
    /// Interval to store.
    pub range: TimeRange,
    /// Status to store.
    pub status: BookingStatus,
    /// Status the row must still have for the write to apply.
    pub expected_status: BookingStatus,
}

/// Async access to every table the service reads or writes.
///
/// Every mutating method is atomic on its own.
#[async_trait]
pub trait Store: Send + Sync + fmt::Debug {
    /// Cheap round-trip used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Loads a user's profile.
    async fn profile(&self, user_id: UserId) -> Result<Option<Profile>, StoreError>;

    /// Loads a room.
    async fn room(&self, room_id: RoomId) -> Result<Option<Room>, StoreError>;

    /// First block on `room_id` intersecting `range`, if any.
    async fn overlapping_block(
        &self,
        room_id: RoomId,
        range: TimeRange,
    ) -> Result<Option<RoomBlock>, StoreError>;

    /// First booking on `room_id` intersecting `range` whose status is in
    /// `statuses`, ignoring `exclude`.
    async fn conflicting_booking(
        &self,
        room_id: RoomId,
        range: TimeRange,
        statuses: &[BookingStatus],
        exclude: Option<BookingId>,
    ) -> Result<Option<Booking>, StoreError>;

    /// Loads a booking.
    async fn booking(&self, booking_id: BookingId) -> Result<Option<Booking>, StoreError>;

    /// Inserts a `pending` booking unless it would overlap an occupying one.
    async fn insert_booking(&self, booking: NewBooking) -> Result<BookingWrite, StoreError>;

    /// Rewrites a booking unless its status moved away from
    /// `changes.expected_status` or the result would overlap another
    /// occupying one.
    async fn update_booking(
        &self,
        booking_id: BookingId,
        changes: BookingChanges,
    ) -> Result<BookingWrite, StoreError>;

    /// Marks a booking cancelled if it is not already; `None` when it was
    /// already cancelled or does not exist.
    async fn cancel_booking(&self, booking_id: BookingId) -> Result<Option<Booking>, StoreError>;

    /// Loads a point rule.
    async fn point_rule(&self, key: RuleKey) -> Result<Option<PointRule>, StoreError>;

    /// Loads an episode.
    async fn episode(&self, episode_id: EpisodeId) -> Result<Option<Episode>, StoreError>;

    /// Loads a user's progress on an episode.
    async fn progress(
        &self,
        user_id: UserId,
        episode_id: EpisodeId,
    ) -> Result<Option<EpisodeProgress>, StoreError>;

    /// Stamps `completed_at` on a progress row that has none.
    async fn mark_completed(
        &self,
        user_id: UserId,
        episode_id: EpisodeId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Counts published episodes of a subject and how many the user completed.
    async fn subject_completion(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<SubjectCompletion, StoreError>;

    /// Writes a ledger row and credits `points` to the owner's wallet
    /// (creating it at level 1) in one atomic step. Nothing is written when
    /// a row with the same key exists.
    async fn award_points(&self, key: &AwardKey, points: i64) -> Result<AwardOutcome, StoreError>;

    /// Loads a wallet.
    async fn wallet(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError>;

    /// Loads a streak.
    async fn streak(&self, user_id: UserId) -> Result<Option<UserStreak>, StoreError>;

    /// Creates or replaces a streak row.
    async fn save_streak(&self, streak: &UserStreak) -> Result<(), StoreError>;
}

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
