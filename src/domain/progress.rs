//! Episodes and per-user viewing progress.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::booking::UnknownVariant;
use super::ids::{EpisodeId, SubjectId, UserId};

/// Watched percentage at which an episode counts as complete.
pub const COMPLETION_THRESHOLD_PERCENT: i32 = 90;

/// Publication state of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeStatus {
    /// Visible to learners; counts towards subject completion.
    Published,
    /// Work in progress.
    Draft,
    /// Withdrawn from listings.
    Hidden,
}

impl EpisodeStatus {
    /// Database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Draft => "draft",
            Self::Hidden => "hidden",
        }
    }
}

impl FromStr for EpisodeStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "published" => Ok(Self::Published),
            "draft" => Ok(Self::Draft),
            "hidden" => Ok(Self::Hidden),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// A course episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    /// Episode identifier.
    pub id: EpisodeId,
    /// Owning subject.
    pub subject_id: SubjectId,
    /// Explicit reward; `None` falls back to the `episode_complete` rule.
    pub points_reward: Option<i64>,
    /// Publication state.
    pub status: EpisodeStatus,
}

/// Viewing progress of one user on one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeProgress {
    /// Viewer.
    pub user_id: UserId,
    /// Episode watched.
    pub episode_id: EpisodeId,
    /// Furthest position reached, 0..=100.
    pub watched_percent: i32,
    /// Set once the episode has been recorded as complete.
    pub completed_at: Option<DateTime<Utc>>,
}

impl EpisodeProgress {
    /// Completion predicate: explicitly completed, or watched past the threshold.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.completed_at.is_some() || self.watched_percent >= COMPLETION_THRESHOLD_PERCENT
    }
}

/// How far a user is through the published episodes of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectCompletion {
    /// Published episodes in the subject.
    pub published: u64,
    /// Of those, how many the user has completed.
    pub completed: u64,
}

impl SubjectCompletion {
    /// `true` when the subject has published episodes and all are complete.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.published > 0 && self.completed >= self.published
    }
}
