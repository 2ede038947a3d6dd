//! In-process [`Store`] with the same guarantees as the PostgreSQL schema.
//!
//! All tables live behind one [`tokio::sync::RwLock`]. Every mutating
//! method takes the write lock once, so the overlap check and the write it
//! guards happen atomically, as does a ledger row with its wallet credit.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{BookingChanges, BookingWrite, Store, StoreError};
use crate::domain::{
    AwardKey, AwardOutcome, Booking, BookingId, BookingStatus, Episode, EpisodeId,
    EpisodeProgress, EpisodeStatus, NewBooking, PointRule, PointTransaction, Profile, Room,
    RoomBlock, RoomId, RuleKey, SubjectCompletion, SubjectId, TimeRange, UserId, UserStreak,
    Wallet,
};

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<UserId, Profile>,
    rooms: HashMap<RoomId, Room>,
    blocks: Vec<RoomBlock>,
    bookings: HashMap<BookingId, Booking>,
    rules: HashMap<RuleKey, PointRule>,
    episodes: HashMap<EpisodeId, Episode>,
    progress: HashMap<(UserId, EpisodeId), EpisodeProgress>,
    ledger: Vec<PointTransaction>,
    wallets: HashMap<UserId, Wallet>,
    streaks: HashMap<UserId, UserStreak>,
}

impl Tables {
    fn overlapping_booking(
        &self,
        room_id: RoomId,
        range: &TimeRange,
        statuses: &[BookingStatus],
        exclude: Option<BookingId>,
    ) -> Option<&Booking> {
        self.bookings
            .values()
            .filter(|b| b.room_id == room_id)
            .filter(|b| Some(b.id) != exclude)
            .filter(|b| statuses.contains(&b.status))
            .filter(|b| b.range.overlaps(range))
            .min_by_key(|b| b.range.start())
    }
}

/// Memory-resident store for tests and `STORE_BACKEND=memory` runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the default point rules.
    #[must_use]
    pub fn with_default_rules() -> Self {
        let mut tables = Tables::default();
        for (key, points) in [
            (RuleKey::EpisodeComplete, 10),
            (RuleKey::SubjectComplete, 50),
            (RuleKey::Streak3, 20),
            (RuleKey::Streak7, 50),
        ] {
            tables.rules.insert(
                key,
                PointRule {
                    key,
                    points,
                    is_active: true,
                },
            );
        }
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Creates or replaces a profile.
    pub async fn put_profile(&self, profile: Profile) {
        self.tables
            .write()
            .await
            .profiles
            .insert(profile.user_id, profile);
    }

    /// Creates or replaces a room.
    pub async fn put_room(&self, room: Room) {
        self.tables.write().await.rooms.insert(room.id, room);
    }

    /// Adds a block.
    pub async fn put_block(&self, block: RoomBlock) {
        self.tables.write().await.blocks.push(block);
    }

    /// Inserts a booking verbatim, bypassing the overlap guard.
    pub async fn put_booking(&self, booking: Booking) {
        self.tables
            .write()
            .await
            .bookings
            .insert(booking.id, booking);
    }

    /// Creates or replaces a point rule.
    pub async fn put_rule(&self, rule: PointRule) {
        self.tables.write().await.rules.insert(rule.key, rule);
    }

    /// Creates or replaces an episode.
    pub async fn put_episode(&self, episode: Episode) {
        self.tables.write().await.episodes.insert(episode.id, episode);
    }

    /// Creates or replaces a progress row.
    pub async fn put_progress(&self, progress: EpisodeProgress) {
        self.tables
            .write()
            .await
            .progress
            .insert((progress.user_id, progress.episode_id), progress);
    }

    /// Creates or replaces a streak row without the max-streak guard.
    pub async fn put_streak(&self, streak: UserStreak) {
        self.tables
            .write()
            .await
            .streaks
            .insert(streak.user_id, streak);
    }

    /// Creates or replaces a wallet without touching the ledger.
    pub async fn put_wallet(&self, wallet: Wallet) {
        self.tables
            .write()
            .await
            .wallets
            .insert(wallet.user_id, wallet);
    }

    /// Ledger rows of one user, oldest first.
    pub async fn ledger(&self, user_id: UserId) -> Vec<PointTransaction> {
        self.tables
            .read()
            .await
            .ledger
            .iter()
            .filter(|t| t.key.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn profile(&self, user_id: UserId) -> Result<Option<Profile>, StoreError> {
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn room(&self, room_id: RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.tables.read().await.rooms.get(&room_id).cloned())
    }

    async fn overlapping_block(
        &self,
        room_id: RoomId,
        range: TimeRange,
    ) -> Result<Option<RoomBlock>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .blocks
            .iter()
            .filter(|b| b.room_id == room_id && b.range.overlaps(&range))
            .min_by_key(|b| b.range.start())
            .cloned())
    }

    async fn conflicting_booking(
        &self,
        room_id: RoomId,
        range: TimeRange,
        statuses: &[BookingStatus],
        exclude: Option<BookingId>,
    ) -> Result<Option<Booking>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .overlapping_booking(room_id, &range, statuses, exclude)
            .cloned())
    }

    async fn booking(&self, booking_id: BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.tables.read().await.bookings.get(&booking_id).cloned())
    }

    async fn insert_booking(&self, booking: NewBooking) -> Result<BookingWrite, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .overlapping_booking(booking.room_id, &booking.range, &BookingStatus::OCCUPYING, None)
            .is_some()
        {
            return Ok(BookingWrite::Overlaps);
        }
        let now = Utc::now();
        let stored = Booking {
            id: BookingId::new(),
            room_id: booking.room_id,
            user_id: booking.user_id,
            title: booking.title,
            description: booking.description,
            range: booking.range,
            status: BookingStatus::Pending,
            points_used: None,
            created_at: now,
            updated_at: now,
        };
        tables.bookings.insert(stored.id, stored.clone());
        Ok(BookingWrite::Written(stored))
    }

    async fn update_booking(
        &self,
        booking_id: BookingId,
        changes: BookingChanges,
    ) -> Result<BookingWrite, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.bookings.get(&booking_id) else {
            return Ok(BookingWrite::Missing);
        };
        let (room_id, status) = (current.room_id, current.status);
        if status != changes.expected_status {
            return Ok(BookingWrite::StatusChanged);
        }
        if changes.status.occupies_slot()
            && tables
                .overlapping_booking(
                    room_id,
                    &changes.range,
                    &BookingStatus::OCCUPYING,
                    Some(booking_id),
                )
                .is_some()
        {
            return Ok(BookingWrite::Overlaps);
        }
        let Some(booking) = tables.bookings.get_mut(&booking_id) else {
            return Ok(BookingWrite::Missing);
        };
        booking.title = changes.title;
        booking.description = changes.description;
        booking.range = changes.range;
        booking.status = changes.status;
        booking.updated_at = Utc::now();
        Ok(BookingWrite::Written(booking.clone()))
    }

    async fn cancel_booking(&self, booking_id: BookingId) -> Result<Option<Booking>, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.bookings.get_mut(&booking_id) {
            Some(booking) if booking.status != BookingStatus::Cancelled => {
                booking.status = BookingStatus::Cancelled;
                booking.updated_at = Utc::now();
                Ok(Some(booking.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn point_rule(&self, key: RuleKey) -> Result<Option<PointRule>, StoreError> {
        Ok(self.tables.read().await.rules.get(&key).cloned())
    }

    async fn episode(&self, episode_id: EpisodeId) -> Result<Option<Episode>, StoreError> {
        Ok(self.tables.read().await.episodes.get(&episode_id).cloned())
    }

    async fn progress(
        &self,
        user_id: UserId,
        episode_id: EpisodeId,
    ) -> Result<Option<EpisodeProgress>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .progress
            .get(&(user_id, episode_id))
            .cloned())
    }

    async fn mark_completed(
        &self,
        user_id: UserId,
        episode_id: EpisodeId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(progress) = self
            .tables
            .write()
            .await
            .progress
            .get_mut(&(user_id, episode_id))
        {
            progress.completed_at.get_or_insert(at);
        }
        Ok(())
    }

    async fn subject_completion(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<SubjectCompletion, StoreError> {
        let tables = self.tables.read().await;
        let mut completion = SubjectCompletion {
            published: 0,
            completed: 0,
        };
        for episode in tables
            .episodes
            .values()
            .filter(|e| e.subject_id == subject_id && e.status == EpisodeStatus::Published)
        {
            completion.published += 1;
            if tables
                .progress
                .get(&(user_id, episode.id))
                .is_some_and(EpisodeProgress::is_complete)
            {
                completion.completed += 1;
            }
        }
        Ok(completion)
    }

    async fn award_points(&self, key: &AwardKey, points: i64) -> Result<AwardOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.ledger.iter().any(|t| t.key == *key) {
            return Ok(AwardOutcome::AlreadyExists);
        }
        let id = i64::try_from(tables.ledger.len()).unwrap_or(i64::MAX).saturating_add(1);
        tables.ledger.push(PointTransaction {
            id,
            key: key.clone(),
            points,
            created_at: Utc::now(),
        });
        let wallet = tables
            .wallets
            .entry(key.user_id)
            .or_insert_with(|| Wallet::empty(key.user_id));
        wallet.total_points = wallet.total_points.saturating_add(points);
        Ok(AwardOutcome::Inserted)
    }

    async fn wallet(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        Ok(self.tables.read().await.wallets.get(&user_id).copied())
    }

    async fn streak(&self, user_id: UserId) -> Result<Option<UserStreak>, StoreError> {
        Ok(self.tables.read().await.streaks.get(&user_id).copied())
    }

    async fn save_streak(&self, streak: &UserStreak) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let max_streak = tables
            .streaks
            .get(&streak.user_id)
            .map_or(streak.max_streak, |s| s.max_streak.max(streak.max_streak));
        tables.streaks.insert(
            streak.user_id,
            UserStreak {
                max_streak,
                ..*streak
            },
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::RefType;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        let Some(t) = Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).single() else {
            panic!("valid timestamp");
        };
        t
    }

    fn range(a: u32, b: u32) -> TimeRange {
        let Ok(r) = TimeRange::new(at(a), at(b)) else {
            panic!("valid range");
        };
        r
    }

    fn new_booking(room_id: RoomId, a: u32, b: u32) -> NewBooking {
        NewBooking {
            room_id,
            user_id: UserId::new(),
            title: "standup".to_string(),
            description: None,
            range: range(a, b),
        }
    }

    #[tokio::test]
    async fn insert_rejects_overlap_atomically() {
        let store = MemoryStore::new();
        let room = RoomId::new();

        let first = store.insert_booking(new_booking(room, 10, 11)).await;
        assert!(matches!(first, Ok(BookingWrite::Written(_))));

        let second = store.insert_booking(new_booking(room, 10, 12)).await;
        assert!(matches!(second, Ok(BookingWrite::Overlaps)));

        let adjacent = store.insert_booking(new_booking(room, 11, 12)).await;
        assert!(matches!(adjacent, Ok(BookingWrite::Written(_))));

        let other_room = store.insert_booking(new_booking(RoomId::new(), 10, 11)).await;
        assert!(matches!(other_room, Ok(BookingWrite::Written(_))));
    }

    #[tokio::test]
    async fn cancelled_bookings_free_the_slot() {
        let store = MemoryStore::new();
        let room = RoomId::new();
        let Ok(BookingWrite::Written(first)) = store.insert_booking(new_booking(room, 10, 11)).await
        else {
            panic!("insert failed");
        };

        let Ok(Some(cancelled)) = store.cancel_booking(first.id).await else {
            panic!("cancel failed");
        };
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(matches!(store.cancel_booking(first.id).await, Ok(None)));

        let retry = store.insert_booking(new_booking(room, 10, 11)).await;
        assert!(matches!(retry, Ok(BookingWrite::Written(_))));
    }

    #[tokio::test]
    async fn update_applies_only_to_the_expected_status() {
        let store = MemoryStore::new();
        let room = RoomId::new();
        let Ok(BookingWrite::Written(booking)) = store.insert_booking(new_booking(room, 10, 11)).await
        else {
            panic!("insert failed");
        };
        let stale = BookingChanges {
            title: "moved".to_string(),
            description: None,
            range: range(12, 13),
            status: BookingStatus::Pending,
            expected_status: BookingStatus::Pending,
        };

        let Ok(Some(_)) = store.cancel_booking(booking.id).await else {
            panic!("cancel failed");
        };
        let write = store.update_booking(booking.id, stale.clone()).await;
        assert!(matches!(write, Ok(BookingWrite::StatusChanged)));

        let Ok(Some(stored)) = store.booking(booking.id).await else {
            panic!("booking missing");
        };
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert_eq!(stored.range, range(10, 11));

        let missing = store.update_booking(BookingId::new(), stale).await;
        assert!(matches!(missing, Ok(BookingWrite::Missing)));
    }

    #[tokio::test]
    async fn award_points_deduplicates_and_credits_together() {
        let store = MemoryStore::new();
        let user = UserId::new();
        assert!(matches!(store.wallet(user).await, Ok(None)));
        let key = AwardKey::new(user, RuleKey::EpisodeComplete, RefType::Episode, "ep-1");

        assert!(matches!(store.award_points(&key, 15).await, Ok(AwardOutcome::Inserted)));
        assert!(matches!(
            store.award_points(&key, 15).await,
            Ok(AwardOutcome::AlreadyExists)
        ));

        let other = AwardKey::new(user, RuleKey::EpisodeComplete, RefType::Episode, "ep-2");
        assert!(matches!(store.award_points(&other, 5).await, Ok(AwardOutcome::Inserted)));
        assert_eq!(store.ledger(user).await.len(), 2);

        let Ok(Some(wallet)) = store.wallet(user).await else {
            panic!("wallet missing");
        };
        assert_eq!(wallet.total_points, 20);
        assert_eq!(wallet.level, Wallet::DEFAULT_LEVEL);
    }

    #[tokio::test]
    async fn save_streak_never_lowers_max() {
        let store = MemoryStore::new();
        let user = UserId::new();
        store
            .put_streak(UserStreak {
                user_id: user,
                current_streak: 1,
                max_streak: 9,
                last_activity_date: None,
            })
            .await;
        let lowered = UserStreak {
            user_id: user,
            current_streak: 2,
            max_streak: 2,
            last_activity_date: None,
        };
        assert!(store.save_streak(&lowered).await.is_ok());
        let Ok(Some(saved)) = store.streak(user).await else {
            panic!("streak missing");
        };
        assert_eq!(saved.current_streak, 2);
        assert_eq!(saved.max_streak, 9);
    }
}
