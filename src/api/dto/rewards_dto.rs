//! Episode completion and rewards bodies.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::EpisodeId;
use crate::service::{CompletionSummary, RewardsSummary};

/// Body of `complete-episode`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteEpisodeRequest {
    /// Episode the caller finished.
    pub episode_id: Option<EpisodeId>,
}

/// Success body of `complete-episode`.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteEpisodeResponse {
    /// Points for the episode; `0` on repeat calls.
    pub gained_episode_points: i64,
    /// Points for completing the subject.
    pub gained_subject_points: i64,
    /// Points for a streak milestone.
    pub gained_streak_points: i64,
    /// Streak after the call.
    pub current_streak: i32,
    /// Longest streak after the call.
    pub max_streak: i32,
}

impl From<CompletionSummary> for CompleteEpisodeResponse {
    fn from(s: CompletionSummary) -> Self {
        Self {
            gained_episode_points: s.gained_episode_points,
            gained_subject_points: s.gained_subject_points,
            gained_streak_points: s.gained_streak_points,
            current_streak: s.current_streak,
            max_streak: s.max_streak,
        }
    }
}

/// Body of `GET /api/v1/me/rewards`.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardsResponse {
    /// Wallet balance.
    pub total_points: i64,
    /// Wallet level.
    pub level: i32,
    /// Current streak.
    pub current_streak: i32,
    /// Longest streak.
    pub max_streak: i32,
    /// Last activity day in the business calendar.
    pub last_activity_date: Option<NaiveDate>,
}

impl From<RewardsSummary> for RewardsResponse {
    fn from(s: RewardsSummary) -> Self {
        Self {
            total_points: s.total_points,
            level: s.level,
            current_streak: s.current_streak,
            max_streak: s.max_streak,
            last_activity_date: s.last_activity_date,
        }
    }
}
