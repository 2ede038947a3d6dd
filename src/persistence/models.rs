//! Database row types and their mapping onto the domain model.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::StoreError;
use crate::domain::{
    Booking, BookingId, Episode, EpisodeId, EpisodeProgress, PointRule, Profile, Room, RoomBlock,
    RoomId, SubjectId, TimeRange, UserId, UserStreak, Wallet,
};

fn corrupt(entity: &'static str, detail: impl ToString) -> StoreError {
    StoreError::Corrupt {
        entity,
        detail: detail.to_string(),
    }
}

fn range(entity: &'static str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<TimeRange, StoreError> {
    TimeRange::new(start, end).map_err(|_| corrupt(entity, format!("end {end} not after start {start}")))
}

/// A row from `profiles`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    /// User id.
    pub id: Uuid,
    /// Role string.
    pub role: String,
    /// Activation flag.
    pub is_active: bool,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::from_uuid(row.id),
            role: row.role.parse().map_err(|e| corrupt("profiles", e))?,
            is_active: row.is_active,
        })
    }
}

/// A row from `rooms`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomRow {
    /// Room id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Status string.
    pub status: String,
}

impl TryFrom<RoomRow> for Room {
    type Error = StoreError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RoomId::from_uuid(row.id),
            name: row.name,
            status: row.status.parse().map_err(|e| corrupt("rooms", e))?,
        })
    }
}

/// A row from `room_blocks`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomBlockRow {
    /// Block id.
    pub id: Uuid,
    /// Room id.
    pub room_id: Uuid,
    /// Inclusive start.
    pub start_at: DateTime<Utc>,
    /// Exclusive end.
    pub end_at: DateTime<Utc>,
    /// Optional reason.
    pub reason: Option<String>,
}

impl TryFrom<RoomBlockRow> for RoomBlock {
    type Error = StoreError;

    fn try_from(row: RoomBlockRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            room_id: RoomId::from_uuid(row.room_id),
            range: range("room_blocks", row.start_at, row.end_at)?,
            reason: row.reason,
        })
    }
}

/// A row from `room_bookings`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingRow {
    /// Booking id.
    pub id: Uuid,
    /// Room id.
    pub room_id: Uuid,
    /// Owner id.
    pub user_id: Uuid,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Inclusive start.
    pub start_at: DateTime<Utc>,
    /// Exclusive end.
    pub end_at: DateTime<Utc>,
    /// Status string.
    pub status: String,
    /// Points consumed.
    pub points_used: Option<i64>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last update instant.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: BookingId::from_uuid(row.id),
            room_id: RoomId::from_uuid(row.room_id),
            user_id: UserId::from_uuid(row.user_id),
            title: row.title,
            description: row.description,
            range: range("room_bookings", row.start_at, row.end_at)?,
            status: row.status.parse().map_err(|e| corrupt("room_bookings", e))?,
            points_used: row.points_used,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row from `point_rules`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PointRuleRow {
    /// Rule key string.
    pub rule_key: String,
    /// Points granted.
    pub points: i64,
    /// Activation flag.
    pub is_active: bool,
}

impl TryFrom<PointRuleRow> for PointRule {
    type Error = StoreError;

    fn try_from(row: PointRuleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            key: row.rule_key.parse().map_err(|e| corrupt("point_rules", e))?,
            points: row.points,
            is_active: row.is_active,
        })
    }
}

/// A row from `episodes`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EpisodeRow {
    /// Episode id.
    pub id: Uuid,
    /// Subject id.
    pub subject_id: Uuid,
    /// Explicit reward.
    pub points_reward: Option<i64>,
    /// Status string.
    pub status: String,
}

impl TryFrom<EpisodeRow> for Episode {
    type Error = StoreError;

    fn try_from(row: EpisodeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EpisodeId::from_uuid(row.id),
            subject_id: SubjectId::from_uuid(row.subject_id),
            points_reward: row.points_reward,
            status: row.status.parse().map_err(|e| corrupt("episodes", e))?,
        })
    }
}

/// A row from `user_episode_progress`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProgressRow {
    /// Viewer id.
    pub user_id: Uuid,
    /// Episode id.
    pub episode_id: Uuid,
    /// Watched percentage.
    pub watched_percent: i32,
    /// Completion stamp.
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<ProgressRow> for EpisodeProgress {
    fn from(row: ProgressRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            episode_id: EpisodeId::from_uuid(row.episode_id),
            watched_percent: row.watched_percent,
            completed_at: row.completed_at,
        }
    }
}

/// A row from `user_wallet`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WalletRow {
    /// Owner id.
    pub user_id: Uuid,
    /// Running total.
    pub total_points: i64,
    /// Level.
    pub level: i32,
}

impl From<WalletRow> for Wallet {
    fn from(row: WalletRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            total_points: row.total_points,
            level: row.level,
        }
    }
}

/// A row from `user_streaks`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StreakRow {
    /// Owner id.
    pub user_id: Uuid,
    /// Current streak.
    pub current_streak: i32,
    /// Best streak.
    pub max_streak: i32,
    /// Last active day.
    pub last_activity_date: Option<NaiveDate>,
}

impl From<StreakRow> for UserStreak {
    fn from(row: StreakRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            current_streak: row.current_streak,
            max_streak: row.max_streak,
            last_activity_date: row.last_activity_date,
        }
    }
}
