//! PostgreSQL implementation of the [`Store`] trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::models::{
    BookingRow, EpisodeRow, PointRuleRow, ProfileRow, ProgressRow, RoomBlockRow, RoomRow,
    StreakRow, WalletRow,
};
use super::{BookingChanges, BookingWrite, Store, StoreError};
use crate::config::ServiceConfig;
use crate::domain::{
    AwardKey, AwardOutcome, Booking, BookingId, BookingStatus, Episode, EpisodeId,
    EpisodeProgress, NewBooking, PointRule, Profile, Room, RoomBlock, RoomId, RuleKey, SubjectId,
    SubjectCompletion, TimeRange, UserId, UserStreak, Wallet,
};

/// SQLSTATE raised by the `room_bookings_no_overlap` exclusion constraint.
const EXCLUSION_VIOLATION: &str = "23P01";

const BOOKING_COLUMNS: &str = "id, room_id, user_id, title, description, start_at, end_at, \
                               status, points_used, created_at, updated_at";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the database cannot be reached.
    pub async fn connect(config: &ServiceConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies pending migrations from `./migrations`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Migration`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Returns the inner connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_exclusion_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(EXCLUSION_VIOLATION))
}

fn booking_write(result: Result<Option<BookingRow>, sqlx::Error>) -> Result<BookingWrite, StoreError> {
    match result {
        Ok(Some(row)) => Ok(BookingWrite::Written(Booking::try_from(row)?)),
        Ok(None) => Ok(BookingWrite::Missing),
        Err(e) if is_exclusion_violation(&e) => Ok(BookingWrite::Overlaps),
        Err(e) => Err(StoreError::Database(e)),
    }
}

fn completion_count(column: &str, value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt {
        entity: "subject_completion",
        detail: format!("negative {column} count {value}"),
    })
}

#[async_trait]
impl Store for PostgresStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    async fn profile(&self, user_id: UserId) -> Result<Option<Profile>, StoreError> {
        sqlx::query_as::<_, ProfileRow>("SELECT id, role, is_active FROM profiles WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::try_from)
            .transpose()
    }

    async fn room(&self, room_id: RoomId) -> Result<Option<Room>, StoreError> {
        sqlx::query_as::<_, RoomRow>("SELECT id, name, status FROM rooms WHERE id = $1")
            .bind(room_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Room::try_from)
            .transpose()
    }

    async fn overlapping_block(
        &self,
        room_id: RoomId,
        range: TimeRange,
    ) -> Result<Option<RoomBlock>, StoreError> {
        sqlx::query_as::<_, RoomBlockRow>(
            "SELECT id, room_id, start_at, end_at, reason FROM room_blocks \
             WHERE room_id = $1 AND start_at < $3 AND end_at > $2 \
             ORDER BY start_at LIMIT 1",
        )
        .bind(room_id.as_uuid())
        .bind(range.start())
        .bind(range.end())
        .fetch_optional(&self.pool)
        .await?
        .map(RoomBlock::try_from)
        .transpose()
    }

    async fn conflicting_booking(
        &self,
        room_id: RoomId,
        range: TimeRange,
        statuses: &[BookingStatus],
        exclude: Option<BookingId>,
    ) -> Result<Option<Booking>, StoreError> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM room_bookings \
             WHERE room_id = $1 AND start_at < $3 AND end_at > $2 \
             AND status = ANY($4) AND ($5::uuid IS NULL OR id <> $5) \
             ORDER BY start_at LIMIT 1"
        );
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(room_id.as_uuid())
            .bind(range.start())
            .bind(range.end())
            .bind(statuses)
            .bind(exclude.map(Uuid::from))
            .fetch_optional(&self.pool)
            .await?
            .map(Booking::try_from)
            .transpose()
    }

    async fn booking(&self, booking_id: BookingId) -> Result<Option<Booking>, StoreError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM room_bookings WHERE id = $1");
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Booking::try_from)
            .transpose()
    }

    async fn insert_booking(&self, booking: NewBooking) -> Result<BookingWrite, StoreError> {
        let sql = format!(
            "INSERT INTO room_bookings (id, room_id, user_id, title, description, start_at, end_at, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending') RETURNING {BOOKING_COLUMNS}"
        );
        let id = BookingId::new();
        let result = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id.as_uuid())
            .bind(booking.room_id.as_uuid())
            .bind(booking.user_id.as_uuid())
            .bind(&booking.title)
            .bind(&booking.description)
            .bind(booking.range.start())
            .bind(booking.range.end())
            .fetch_optional(&self.pool)
            .await;
        booking_write(result)
    }

    async fn update_booking(
        &self,
        booking_id: BookingId,
        changes: BookingChanges,
    ) -> Result<BookingWrite, StoreError> {
        let sql = format!(
            "UPDATE room_bookings SET title = $2, description = $3, start_at = $4, end_at = $5, \
             status = $6, updated_at = now() WHERE id = $1 AND status = $7 \
             RETURNING {BOOKING_COLUMNS}"
        );
        let result = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking_id.as_uuid())
            .bind(&changes.title)
            .bind(&changes.description)
            .bind(changes.range.start())
            .bind(changes.range.end())
            .bind(changes.status.as_str())
            .bind(changes.expected_status.as_str())
            .fetch_optional(&self.pool)
            .await;
        if !matches!(result, Ok(None)) {
            return booking_write(result);
        }
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM room_bookings WHERE id = $1)",
        )
        .bind(booking_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(if exists {
            BookingWrite::StatusChanged
        } else {
            BookingWrite::Missing
        })
    }

    async fn cancel_booking(&self, booking_id: BookingId) -> Result<Option<Booking>, StoreError> {
        let sql = format!(
            "UPDATE room_bookings SET status = 'cancelled', updated_at = now() \
             WHERE id = $1 AND status <> 'cancelled' RETURNING {BOOKING_COLUMNS}"
        );
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Booking::try_from)
            .transpose()
    }

    async fn point_rule(&self, key: RuleKey) -> Result<Option<PointRule>, StoreError> {
        sqlx::query_as::<_, PointRuleRow>(
            "SELECT rule_key, points, is_active FROM point_rules WHERE rule_key = $1",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(PointRule::try_from)
        .transpose()
    }

    async fn episode(&self, episode_id: EpisodeId) -> Result<Option<Episode>, StoreError> {
        sqlx::query_as::<_, EpisodeRow>(
            "SELECT id, subject_id, points_reward, status FROM episodes WHERE id = $1",
        )
        .bind(episode_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(Episode::try_from)
        .transpose()
    }

    async fn progress(
        &self,
        user_id: UserId,
        episode_id: EpisodeId,
    ) -> Result<Option<EpisodeProgress>, StoreError> {
        let row = sqlx::query_as::<_, ProgressRow>(
            "SELECT user_id, episode_id, watched_percent, completed_at \
             FROM user_episode_progress WHERE user_id = $1 AND episode_id = $2",
        )
        .bind(user_id.as_uuid())
        .bind(episode_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(EpisodeProgress::from))
    }

    async fn mark_completed(
        &self,
        user_id: UserId,
        episode_id: EpisodeId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE user_episode_progress SET completed_at = $3, updated_at = now() \
             WHERE user_id = $1 AND episode_id = $2 AND completed_at IS NULL",
        )
        .bind(user_id.as_uuid())
        .bind(episode_id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn subject_completion(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<SubjectCompletion, StoreError> {
        let (published, completed) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), \
                    COUNT(p.episode_id) FILTER (WHERE p.completed_at IS NOT NULL OR p.watched_percent >= 90) \
             FROM episodes e \
             LEFT JOIN user_episode_progress p ON p.episode_id = e.id AND p.user_id = $1 \
             WHERE e.subject_id = $2 AND e.status = 'published'",
        )
        .bind(user_id.as_uuid())
        .bind(subject_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(SubjectCompletion {
            published: completion_count("published", published)?,
            completed: completion_count("completed", completed)?,
        })
    }

    async fn award_points(&self, key: &AwardKey, points: i64) -> Result<AwardOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO point_transactions (user_id, rule_key, ref_type, ref_id, points) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, rule_key, ref_type, ref_id) DO NOTHING RETURNING id",
        )
        .bind(key.user_id.as_uuid())
        .bind(key.rule_key.as_str())
        .bind(key.ref_type.as_str())
        .bind(&key.ref_id)
        .bind(points)
        .fetch_optional(&mut *tx)
        .await?;
        if inserted.is_none() {
            tx.rollback().await?;
            return Ok(AwardOutcome::AlreadyExists);
        }
        sqlx::query(
            "INSERT INTO user_wallet (user_id, total_points, level) VALUES ($1, $2, 1) \
             ON CONFLICT (user_id) DO UPDATE \
             SET total_points = user_wallet.total_points + EXCLUDED.total_points, updated_at = now()",
        )
        .bind(key.user_id.as_uuid())
        .bind(points)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(AwardOutcome::Inserted)
    }

    async fn wallet(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        let row = sqlx::query_as::<_, WalletRow>(
            "SELECT user_id, total_points, level FROM user_wallet WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Wallet::from))
    }

    async fn streak(&self, user_id: UserId) -> Result<Option<UserStreak>, StoreError> {
        let row = sqlx::query_as::<_, StreakRow>(
            "SELECT user_id, current_streak, max_streak, last_activity_date \
             FROM user_streaks WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserStreak::from))
    }

    async fn save_streak(&self, streak: &UserStreak) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_streaks (user_id, current_streak, max_streak, last_activity_date) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE SET current_streak = EXCLUDED.current_streak, \
             max_streak = GREATEST(user_streaks.max_streak, EXCLUDED.max_streak), \
             last_activity_date = EXCLUDED.last_activity_date, updated_at = now()",
        )
        .bind(streak.user_id.as_uuid())
        .bind(streak.current_streak)
        .bind(streak.max_streak)
        .bind(streak.last_activity_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_counts_must_be_non_negative() {
        assert!(matches!(completion_count("published", 3), Ok(3)));
        assert!(matches!(completion_count("completed", 0), Ok(0)));
        assert!(matches!(
            completion_count("completed", -1),
            Err(StoreError::Corrupt {
                entity: "subject_completion",
                ..
            })
        ));
    }
}
