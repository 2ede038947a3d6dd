//! Booking service: create, update, cancel and review room bookings.

use std::sync::Arc;

use crate::domain::booking::{
    CANCEL_CUTOFF_HOURS, EDIT_CUTOFF_HOURS, before_cutoff, check_new_window,
};
use crate::domain::{
    AwardKey, AwardOutcome, Booking, BookingDraft, BookingId, BookingPatch, BookingStatus,
    BusinessCalendar, Clock, NewBooking, Profile, Reason, RefType, RoomId, RoomStatus, RuleKey,
    TimeRange, UserId, Verdict,
};
use crate::error::ApiError;
use crate::persistence::{BookingChanges, BookingWrite, Store};

use super::{Halt, require_active, settle};

/// Final status an admin can assign to a pending booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Confirm the booking.
    Approve,
    /// Decline the booking.
    Reject,
}

/// Orchestrates every booking mutation.
///
/// Each method re-reads what it needs from the store; no state survives
/// between calls. The block and conflict scans are fast-path checks, the
/// store's own overlap guard is what makes the invariant hold under races.
#[derive(Debug, Clone)]
pub struct BookingService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    calendar: BusinessCalendar,
}

impl BookingService {
    /// Creates a new `BookingService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, calendar: BusinessCalendar) -> Self {
        Self {
            store,
            clock,
            calendar,
        }
    }

    /// Creates a `pending` booking.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] only for store failures on read paths; every
    /// business rule violation comes back as `Ok(Err(reason))`.
    pub async fn create(
        &self,
        user_id: UserId,
        draft: BookingDraft,
    ) -> Result<Verdict<Booking>, ApiError> {
        settle(self.try_create(user_id, draft).await)
    }

    async fn try_create(&self, user_id: UserId, draft: BookingDraft) -> Result<Booking, Halt> {
        let now = self.clock.now();
        let range = check_new_window(draft.start, draft.end, now, &self.calendar)?;

        require_active(self.store.profile(user_id).await?)?;
        self.require_bookable_room(draft.room_id).await?;
        self.require_free(draft.room_id, range, &BookingStatus::OCCUPYING, None)
            .await?;

        let new_booking = NewBooking {
            room_id: draft.room_id,
            user_id,
            title: draft.title,
            description: draft.description,
            range,
        };
        match self.store.insert_booking(new_booking).await {
            Ok(BookingWrite::Written(booking)) => {
                tracing::info!(booking_id = %booking.id, room_id = %booking.room_id, %user_id, "booking created");
                Ok(booking)
            }
            Ok(BookingWrite::Overlaps) => Err(Reason::TimeConflict.into()),
            Ok(BookingWrite::Missing | BookingWrite::StatusChanged) => Err(Reason::InsertFail.into()),
            Err(e) => {
                tracing::error!(error = %e, %user_id, "booking insert failed");
                Err(Reason::InsertFail.into())
            }
        }
    }

    /// Applies a partial update to a booking.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for store failures on read paths.
    pub async fn update(
        &self,
        user_id: UserId,
        booking_id: BookingId,
        patch: BookingPatch,
    ) -> Result<Verdict<Booking>, ApiError> {
        settle(self.try_update(user_id, booking_id, patch).await)
    }

    async fn try_update(
        &self,
        user_id: UserId,
        booking_id: BookingId,
        patch: BookingPatch,
    ) -> Result<Booking, Halt> {
        let now = self.clock.now();
        let profile = require_active(self.store.profile(user_id).await?)?;
        let booking = self.owned_booking(&profile, booking_id).await?;

        if !booking.status.occupies_slot() {
            return Err(Reason::BookingNotActive.into());
        }
        if !profile.is_admin() && !before_cutoff(booking.range.start(), now, EDIT_CUTOFF_HOURS) {
            return Err(Reason::TooLateToEdit.into());
        }

        let range = if patch.touches_time() {
            let start = patch.start.unwrap_or_else(|| booking.range.start());
            let end = patch.end.unwrap_or_else(|| booking.range.end());
            let range = if profile.is_admin() {
                let range = TimeRange::new(start, end)?;
                if range.start() < now {
                    return Err(Reason::CannotBookPast.into());
                }
                range
            } else {
                check_new_window(start, end, now, &self.calendar)?
            };
            self.require_free(
                booking.room_id,
                range,
                &BookingStatus::OCCUPYING,
                Some(booking.id),
            )
            .await?;
            range
        } else {
            booking.range
        };

        let changes = BookingChanges {
            title: patch.title.unwrap_or(booking.title),
            description: patch.description.or(booking.description),
            range,
            status: booking.status,
            expected_status: booking.status,
        };
        match self.store.update_booking(booking_id, changes).await {
            Ok(BookingWrite::Written(updated)) => {
                tracing::info!(%booking_id, %user_id, "booking updated");
                Ok(updated)
            }
            Ok(BookingWrite::Overlaps) => Err(Reason::TimeConflict.into()),
            Ok(BookingWrite::Missing) => Err(Reason::BookingNotFound.into()),
            Ok(BookingWrite::StatusChanged) => Err(Reason::BookingNotActive.into()),
            Err(e) => {
                tracing::error!(error = %e, %booking_id, "booking update failed");
                Err(Reason::UpdateFail.into())
            }
        }
    }

    /// Cancels a booking and refunds any points it consumed.
    ///
    /// The refund is written before the status flip and is keyed on the
    /// booking, so a retried or concurrent cancellation never refunds twice.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for store failures on read and refund paths.
    pub async fn cancel(
        &self,
        user_id: UserId,
        booking_id: BookingId,
    ) -> Result<Verdict<Booking>, ApiError> {
        settle(self.try_cancel(user_id, booking_id).await)
    }

    async fn try_cancel(&self, user_id: UserId, booking_id: BookingId) -> Result<Booking, Halt> {
        let now = self.clock.now();
        let profile = require_active(self.store.profile(user_id).await?)?;
        let booking = self.owned_booking(&profile, booking_id).await?;

        match booking.status {
            BookingStatus::Cancelled => return Err(Reason::AlreadyCancelled.into()),
            BookingStatus::Rejected => return Err(Reason::BookingNotActive.into()),
            BookingStatus::Pending | BookingStatus::Approved => {}
        }
        if !profile.is_admin() && !before_cutoff(booking.range.start(), now, CANCEL_CUTOFF_HOURS) {
            return Err(Reason::TooLateToCancel.into());
        }

        if let Some(points) = booking.points_used.filter(|p| *p > 0) {
            self.refund(&booking, points).await?;
        }

        match self.store.cancel_booking(booking_id).await {
            Ok(Some(cancelled)) => {
                tracing::info!(%booking_id, %user_id, "booking cancelled");
                Ok(cancelled)
            }
            Ok(None) => Err(Reason::AlreadyCancelled.into()),
            Err(e) => {
                tracing::error!(error = %e, %booking_id, "booking cancel failed");
                Err(Reason::CancelFail.into())
            }
        }
    }

    /// Approves or rejects a pending booking (admins only).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for store failures on read paths.
    pub async fn review(
        &self,
        user_id: UserId,
        booking_id: BookingId,
        decision: ReviewDecision,
    ) -> Result<Verdict<Booking>, ApiError> {
        settle(self.try_review(user_id, booking_id, decision).await)
    }

    async fn try_review(
        &self,
        user_id: UserId,
        booking_id: BookingId,
        decision: ReviewDecision,
    ) -> Result<Booking, Halt> {
        let profile = require_active(self.store.profile(user_id).await?)?;
        if !profile.is_admin() {
            return Err(Reason::NotOwner.into());
        }
        let booking = self
            .store
            .booking(booking_id)
            .await?
            .ok_or(Reason::BookingNotFound)?;
        if booking.status != BookingStatus::Pending {
            return Err(Reason::BookingNotActive.into());
        }

        let status = match decision {
            ReviewDecision::Approve => {
                self.require_free(
                    booking.room_id,
                    booking.range,
                    &[BookingStatus::Approved],
                    Some(booking.id),
                )
                .await?;
                BookingStatus::Approved
            }
            ReviewDecision::Reject => BookingStatus::Rejected,
        };

        let changes = BookingChanges {
            title: booking.title,
            description: booking.description,
            range: booking.range,
            status,
            expected_status: BookingStatus::Pending,
        };
        match self.store.update_booking(booking_id, changes).await {
            Ok(BookingWrite::Written(reviewed)) => {
                tracing::info!(%booking_id, reviewer = %user_id, %status, "booking reviewed");
                Ok(reviewed)
            }
            Ok(BookingWrite::Overlaps) => Err(Reason::TimeConflict.into()),
            Ok(BookingWrite::Missing) => Err(Reason::BookingNotFound.into()),
            Ok(BookingWrite::StatusChanged) => Err(Reason::BookingNotActive.into()),
            Err(e) => {
                tracing::error!(error = %e, %booking_id, "booking review failed");
                Err(Reason::UpdateFail.into())
            }
        }
    }

    async fn owned_booking(&self, caller: &Profile, booking_id: BookingId) -> Result<Booking, Halt> {
        let booking = self
            .store
            .booking(booking_id)
            .await?
            .ok_or(Reason::BookingNotFound)?;
        if booking.user_id != caller.user_id && !caller.is_admin() {
            return Err(Reason::NotOwner.into());
        }
        Ok(booking)
    }

    async fn require_bookable_room(&self, room_id: RoomId) -> Result<(), Halt> {
        let room = self
            .store
            .room(room_id)
            .await?
            .ok_or(Reason::RoomNotFound)?;
        if room.status != RoomStatus::Active {
            return Err(Reason::RoomNotActive.into());
        }
        Ok(())
    }

    async fn require_free(
        &self,
        room_id: RoomId,
        range: TimeRange,
        statuses: &[BookingStatus],
        exclude: Option<BookingId>,
    ) -> Result<(), Halt> {
        if let Some(block) = self.store.overlapping_block(room_id, range).await? {
            tracing::debug!(%room_id, block_id = %block.id, "requested slot is blocked");
            return Err(Reason::Blocked.into());
        }
        if let Some(existing) = self
            .store
            .conflicting_booking(room_id, range, statuses, exclude)
            .await?
        {
            tracing::debug!(%room_id, conflicting = %existing.id, "requested slot is taken");
            return Err(Reason::TimeConflict.into());
        }
        Ok(())
    }

    async fn refund(&self, booking: &Booking, points: i64) -> Result<(), Halt> {
        let key = AwardKey::new(
            booking.user_id,
            RuleKey::BookingUse,
            RefType::BookingRefund,
            booking.id.to_string(),
        );
        if self.store.award_points(&key, points).await? == AwardOutcome::Inserted {
            tracing::info!(booking_id = %booking.id, user_id = %booking.user_id, points, "booking points refunded");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{FixedClock, Role, Room, RoomBlock, Wallet};
    use crate::persistence::MemoryStore;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        let Some(t) = Utc.with_ymd_and_hms(2024, m, d, h, min, 0).single() else {
            panic!("valid timestamp");
        };
        t
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<FixedClock>,
        service: BookingService,
        room: RoomId,
        learner: UserId,
        other: UserId,
        admin: UserId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::with_default_rules());
        // Ten days before the 1st of March.
        let clock = Arc::new(FixedClock::new(at(2, 20, 9, 0)));
        let service = BookingService::new(
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            BusinessCalendar::default(),
        );
        let room = RoomId::new();
        store
            .put_room(Room {
                id: room,
                name: "Everest".to_string(),
                status: RoomStatus::Active,
            })
            .await;
        let (learner, other, admin) = (UserId::new(), UserId::new(), UserId::new());
        for (user_id, role) in [(learner, Role::Learner), (other, Role::Learner), (admin, Role::Admin)] {
            store
                .put_profile(Profile {
                    user_id,
                    role,
                    is_active: true,
                })
                .await;
        }
        Fixture {
            store,
            clock,
            service,
            room,
            learner,
            other,
            admin,
        }
    }

    fn draft(room_id: RoomId, start: DateTime<Utc>, end: DateTime<Utc>) -> BookingDraft {
        BookingDraft {
            room_id,
            title: "Quarterly planning".to_string(),
            description: Some("Bring laptops".to_string()),
            start,
            end,
        }
    }

    async fn book(f: &Fixture, user: UserId, start: DateTime<Utc>, end: DateTime<Utc>) -> Verdict<Booking> {
        let Ok(verdict) = f.service.create(user, draft(f.room, start, end)).await else {
            panic!("store failure");
        };
        verdict
    }

    #[tokio::test]
    async fn create_then_conflicting_request_is_declined() {
        let f = fixture().await;
        let Ok(first) = book(&f, f.learner, at(3, 1, 10, 0), at(3, 1, 11, 0)).await else {
            panic!("first booking declined");
        };
        assert_eq!(first.status, BookingStatus::Pending);
        assert_eq!(first.user_id, f.learner);

        let second = book(&f, f.other, at(3, 1, 10, 30), at(3, 1, 11, 30)).await;
        assert_eq!(second, Err(Reason::TimeConflict));

        let back_to_back = book(&f, f.other, at(3, 1, 11, 0), at(3, 1, 12, 0)).await;
        assert!(back_to_back.is_ok());
    }

    #[tokio::test]
    async fn window_rules() {
        let f = fixture().await;
        assert_eq!(
            book(&f, f.learner, at(3, 1, 11, 0), at(3, 1, 10, 0)).await,
            Err(Reason::InvalidTime)
        );
        assert_eq!(
            book(&f, f.learner, at(2, 19, 10, 0), at(2, 19, 11, 0)).await,
            Err(Reason::CannotBookPast)
        );
        assert_eq!(
            book(&f, f.learner, at(2, 21, 10, 0), at(2, 21, 11, 0)).await,
            Err(Reason::TooSoon)
        );
        // Exactly seven days ahead, earlier in the day than now.
        assert!(book(&f, f.learner, at(2, 27, 8, 0), at(2, 27, 8, 30)).await.is_ok());
    }

    #[tokio::test]
    async fn inactive_user_and_room_checks() {
        let f = fixture().await;
        f.store
            .put_profile(Profile {
                user_id: f.other,
                role: Role::Learner,
                is_active: false,
            })
            .await;
        assert_eq!(
            book(&f, f.other, at(3, 1, 10, 0), at(3, 1, 11, 0)).await,
            Err(Reason::UserInactive)
        );
        assert_eq!(
            book(&f, UserId::new(), at(3, 1, 10, 0), at(3, 1, 11, 0)).await,
            Err(Reason::UserInactive)
        );

        let Ok(missing) = f
            .service
            .create(f.learner, draft(RoomId::new(), at(3, 1, 10, 0), at(3, 1, 11, 0)))
            .await
        else {
            panic!("store failure");
        };
        assert_eq!(missing, Err(Reason::RoomNotFound));

        f.store
            .put_room(Room {
                id: f.room,
                name: "Everest".to_string(),
                status: RoomStatus::Inactive,
            })
            .await;
        assert_eq!(
            book(&f, f.learner, at(3, 1, 10, 0), at(3, 1, 11, 0)).await,
            Err(Reason::RoomNotActive)
        );
    }

    #[tokio::test]
    async fn blocks_decline_overlapping_requests() {
        let f = fixture().await;
        let Ok(range) = TimeRange::new(at(3, 1, 9, 0), at(3, 1, 12, 0)) else {
            panic!("valid range");
        };
        f.store
            .put_block(RoomBlock {
                id: uuid::Uuid::new_v4(),
                room_id: f.room,
                range,
                reason: Some("Renovation".to_string()),
            })
            .await;
        assert_eq!(
            book(&f, f.learner, at(3, 1, 11, 30), at(3, 1, 13, 0)).await,
            Err(Reason::Blocked)
        );
        assert!(book(&f, f.learner, at(3, 1, 12, 0), at(3, 1, 13, 0)).await.is_ok());
    }

    #[tokio::test]
    async fn rejected_and_cancelled_bookings_do_not_block() {
        let f = fixture().await;
        let Ok(first) = book(&f, f.learner, at(3, 1, 10, 0), at(3, 1, 11, 0)).await else {
            panic!("declined");
        };
        let Ok(Ok(_)) = f.service.review(f.admin, first.id, ReviewDecision::Reject).await else {
            panic!("review failed");
        };
        let Ok(second) = book(&f, f.other, at(3, 1, 10, 0), at(3, 1, 11, 0)).await else {
            panic!("rejected booking still blocks");
        };
        let Ok(Ok(_)) = f.service.cancel(f.other, second.id).await else {
            panic!("cancel failed");
        };
        assert!(book(&f, f.learner, at(3, 1, 10, 0), at(3, 1, 11, 0)).await.is_ok());
    }

    #[tokio::test]
    async fn update_is_partial_and_excludes_itself_from_conflicts() {
        let f = fixture().await;
        let Ok(booking) = book(&f, f.learner, at(3, 1, 10, 0), at(3, 1, 11, 0)).await else {
            panic!("declined");
        };

        // Shift by 30 minutes: overlaps only its own old slot.
        let patch = BookingPatch {
            start: Some(at(3, 1, 10, 30)),
            end: Some(at(3, 1, 11, 30)),
            ..BookingPatch::default()
        };
        let Ok(Ok(moved)) = f.service.update(f.learner, booking.id, patch).await else {
            panic!("update declined");
        };
        assert_eq!(moved.range.start(), at(3, 1, 10, 30));
        assert_eq!(moved.title, "Quarterly planning");
        assert_eq!(moved.description.as_deref(), Some("Bring laptops"));

        let retitle = BookingPatch {
            title: Some("Retro".to_string()),
            ..BookingPatch::default()
        };
        let Ok(Ok(renamed)) = f.service.update(f.learner, booking.id, retitle).await else {
            panic!("update declined");
        };
        assert_eq!(renamed.title, "Retro");
        assert_eq!(renamed.range.start(), at(3, 1, 10, 30));
    }

    #[tokio::test]
    async fn update_rules() {
        let f = fixture().await;
        let Ok(mine) = book(&f, f.learner, at(3, 1, 10, 0), at(3, 1, 11, 0)).await else {
            panic!("declined");
        };
        let Ok(theirs) = book(&f, f.other, at(3, 1, 12, 0), at(3, 1, 13, 0)).await else {
            panic!("declined");
        };

        let into_theirs = BookingPatch {
            end: Some(at(3, 1, 12, 30)),
            ..BookingPatch::default()
        };
        let Ok(verdict) = f.service.update(f.learner, mine.id, into_theirs).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::TimeConflict));

        let Ok(verdict) = f.service.update(f.learner, theirs.id, BookingPatch::default()).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::NotOwner));

        let Ok(verdict) = f.service.update(f.learner, BookingId::new(), BookingPatch::default()).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::BookingNotFound));

        let inverted = BookingPatch {
            end: Some(at(3, 1, 9, 0)),
            ..BookingPatch::default()
        };
        let Ok(verdict) = f.service.update(f.learner, mine.id, inverted).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::InvalidTime));

        // Ninety minutes before the start only an admin may edit.
        f.clock.set(at(3, 1, 8, 30));
        let Ok(verdict) = f.service.update(f.learner, mine.id, BookingPatch::default()).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::TooLateToEdit));
        let Ok(verdict) = f.service.update(f.admin, mine.id, BookingPatch::default()).await else {
            panic!("store failure");
        };
        assert!(verdict.is_ok());
    }

    #[tokio::test]
    async fn cannot_update_cancelled_booking() {
        let f = fixture().await;
        let Ok(booking) = book(&f, f.learner, at(3, 1, 10, 0), at(3, 1, 11, 0)).await else {
            panic!("declined");
        };
        let Ok(Ok(_)) = f.service.cancel(f.learner, booking.id).await else {
            panic!("cancel failed");
        };
        let Ok(verdict) = f.service.update(f.learner, booking.id, BookingPatch::default()).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::BookingNotActive));
    }

    #[tokio::test]
    async fn cancel_refunds_points_exactly_once() {
        let f = fixture().await;
        let Ok(range) = TimeRange::new(at(3, 2, 10, 0), at(3, 2, 11, 0)) else {
            panic!("valid range");
        };
        let booking = Booking {
            id: BookingId::new(),
            room_id: f.room,
            user_id: f.learner,
            title: "Paid slot".to_string(),
            description: None,
            range,
            status: BookingStatus::Approved,
            points_used: Some(30),
            created_at: at(2, 1, 0, 0),
            updated_at: at(2, 1, 0, 0),
        };
        f.store.put_booking(booking.clone()).await;
        f.store
            .put_wallet(Wallet {
                user_id: f.learner,
                total_points: 100,
                level: Wallet::DEFAULT_LEVEL,
            })
            .await;

        let Ok(Ok(cancelled)) = f.service.cancel(f.learner, booking.id).await else {
            panic!("cancel declined");
        };
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        let Ok(Some(wallet)) = f.store.wallet(f.learner).await else {
            panic!("wallet missing");
        };
        assert_eq!(wallet.total_points, 130);

        let ledger = f.store.ledger(f.learner).await;
        assert_eq!(ledger.len(), 1);
        let Some(row) = ledger.first() else {
            panic!("ledger empty");
        };
        assert_eq!(row.key.rule_key, RuleKey::BookingUse);
        assert_eq!(row.points, 30);

        let Ok(again) = f.service.cancel(f.learner, booking.id).await else {
            panic!("store failure");
        };
        assert_eq!(again, Err(Reason::AlreadyCancelled));
        assert_eq!(f.store.ledger(f.learner).await.len(), 1);
    }

    #[tokio::test]
    async fn cancel_cutoff_and_ownership() {
        let f = fixture().await;
        let Ok(booking) = book(&f, f.learner, at(3, 1, 10, 0), at(3, 1, 11, 0)).await else {
            panic!("declined");
        };

        let Ok(verdict) = f.service.cancel(f.other, booking.id).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::NotOwner));

        f.clock.set(at(3, 1, 9, 30));
        let Ok(verdict) = f.service.cancel(f.learner, booking.id).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::TooLateToCancel));

        let Ok(verdict) = f.service.cancel(f.admin, booking.id).await else {
            panic!("store failure");
        };
        assert!(verdict.is_ok());
    }

    #[tokio::test]
    async fn review_requires_admin_and_pending() {
        let f = fixture().await;
        let Ok(booking) = book(&f, f.learner, at(3, 1, 10, 0), at(3, 1, 11, 0)).await else {
            panic!("declined");
        };

        let Ok(verdict) = f.service.review(f.learner, booking.id, ReviewDecision::Approve).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::NotOwner));

        let Ok(Ok(approved)) = f.service.review(f.admin, booking.id, ReviewDecision::Approve).await else {
            panic!("approval declined");
        };
        assert_eq!(approved.status, BookingStatus::Approved);

        let Ok(verdict) = f.service.review(f.admin, booking.id, ReviewDecision::Reject).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::BookingNotActive));

        // An approved booking still occupies its slot.
        f.clock.advance(Duration::hours(1));
        assert_eq!(
            book(&f, f.other, at(3, 1, 10, 0), at(3, 1, 11, 0)).await,
            Err(Reason::TimeConflict)
        );
    }

    #[tokio::test]
    async fn stale_rewrite_cannot_resurrect_cancelled_booking() {
        let f = fixture().await;
        let Ok(range) = TimeRange::new(at(3, 2, 10, 0), at(3, 2, 11, 0)) else {
            panic!("valid range");
        };
        let booking = Booking {
            id: BookingId::new(),
            room_id: f.room,
            user_id: f.learner,
            title: "Paid slot".to_string(),
            description: None,
            range,
            status: BookingStatus::Pending,
            points_used: Some(30),
            created_at: at(2, 1, 0, 0),
            updated_at: at(2, 1, 0, 0),
        };
        f.store.put_booking(booking.clone()).await;
        let Ok(Some(before_cancel)) = f.store.booking(booking.id).await else {
            panic!("booking missing");
        };

        let Ok(Ok(_)) = f.service.cancel(f.learner, booking.id).await else {
            panic!("cancel declined");
        };

        // An update or review that read the booking before the cancel lands late.
        let late = BookingChanges {
            title: "Renamed".to_string(),
            description: before_cancel.description.clone(),
            range: before_cancel.range,
            status: BookingStatus::Approved,
            expected_status: before_cancel.status,
        };
        let write = f.store.update_booking(booking.id, late).await;
        assert!(matches!(write, Ok(BookingWrite::StatusChanged)));

        let Ok(Some(stored)) = f.store.booking(booking.id).await else {
            panic!("booking missing");
        };
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert_eq!(stored.title, "Paid slot");
        assert_eq!(f.store.ledger(f.learner).await.len(), 1);

        let Ok(verdict) = f.service.review(f.admin, booking.id, ReviewDecision::Approve).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::BookingNotActive));
        assert!(book(&f, f.other, at(3, 2, 10, 0), at(3, 2, 11, 0)).await.is_ok());
    }

    #[tokio::test]
    async fn update_into_block_is_declined() {
        let f = fixture().await;
        let Ok(booking) = book(&f, f.learner, at(3, 1, 10, 0), at(3, 1, 11, 0)).await else {
            panic!("declined");
        };
        let Ok(range) = TimeRange::new(at(3, 1, 12, 0), at(3, 1, 14, 0)) else {
            panic!("valid range");
        };
        f.store
            .put_block(RoomBlock {
                id: uuid::Uuid::new_v4(),
                room_id: f.room,
                range,
                reason: None,
            })
            .await;

        let into_block = BookingPatch {
            end: Some(at(3, 1, 12, 30)),
            ..BookingPatch::default()
        };
        let Ok(verdict) = f.service.update(f.learner, booking.id, into_block).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::Blocked));

        let Ok(Some(stored)) = f.store.booking(booking.id).await else {
            panic!("booking missing");
        };
        assert_eq!(stored.range.end(), at(3, 1, 11, 0));
    }

    #[tokio::test]
    async fn admin_update_skips_lead_time_but_not_the_past() {
        let f = fixture().await;
        let Ok(booking) = book(&f, f.learner, at(3, 1, 10, 0), at(3, 1, 11, 0)).await else {
            panic!("declined");
        };
        let tomorrow = BookingPatch {
            start: Some(at(2, 21, 10, 0)),
            end: Some(at(2, 21, 11, 0)),
            ..BookingPatch::default()
        };

        let Ok(verdict) = f.service.update(f.learner, booking.id, tomorrow.clone()).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::TooSoon));

        let Ok(Ok(moved)) = f.service.update(f.admin, booking.id, tomorrow).await else {
            panic!("admin update declined");
        };
        assert_eq!(moved.range.start(), at(2, 21, 10, 0));
        assert_eq!(moved.user_id, f.learner);

        let yesterday = BookingPatch {
            start: Some(at(2, 19, 10, 0)),
            end: Some(at(2, 19, 11, 0)),
            ..BookingPatch::default()
        };
        let Ok(verdict) = f.service.update(f.admin, booking.id, yesterday).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::CannotBookPast));
    }

    #[tokio::test]
    async fn approval_declines_when_an_approved_booking_overlaps() {
        let f = fixture().await;
        let Ok(pending) = book(&f, f.learner, at(3, 1, 10, 0), at(3, 1, 11, 0)).await else {
            panic!("declined");
        };
        let Ok(range) = TimeRange::new(at(3, 1, 10, 30), at(3, 1, 11, 30)) else {
            panic!("valid range");
        };
        f.store
            .put_booking(Booking {
                id: BookingId::new(),
                room_id: f.room,
                user_id: f.other,
                title: "Board meeting".to_string(),
                description: None,
                range,
                status: BookingStatus::Approved,
                points_used: None,
                created_at: at(2, 1, 0, 0),
                updated_at: at(2, 1, 0, 0),
            })
            .await;

        let Ok(verdict) = f.service.review(f.admin, pending.id, ReviewDecision::Approve).await else {
            panic!("store failure");
        };
        assert_eq!(verdict, Err(Reason::TimeConflict));

        let Ok(Some(stored)) = f.store.booking(pending.id).await else {
            panic!("booking missing");
        };
        assert_eq!(stored.status, BookingStatus::Pending);
    }
}
