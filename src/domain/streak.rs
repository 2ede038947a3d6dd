//! Daily activity streaks.
//!
//! A streak advances at most once per calendar day. Milestone rewards fire
//! on exact equality with 3 and 7; since a streak only ever grows by one per
//! day, each milestone is crossed on exactly one day.

use chrono::NaiveDate;

use super::ids::UserId;
use super::points::RuleKey;

/// Per-user streak counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserStreak {
    /// Owner.
    pub user_id: UserId,
    /// Consecutive active days ending at `last_activity_date`.
    pub current_streak: i32,
    /// Longest streak ever observed.
    pub max_streak: i32,
    /// Business-calendar date of the last recorded activity.
    pub last_activity_date: Option<NaiveDate>,
}

/// Result of registering activity on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakStep {
    /// Activity already recorded today; nothing to write.
    SameDay(UserStreak),
    /// Counters changed and must be persisted.
    Advanced(UserStreak),
}

impl StreakStep {
    /// The streak after the step, written or not.
    #[must_use]
    pub const fn streak(&self) -> &UserStreak {
        match self {
            Self::SameDay(s) | Self::Advanced(s) => s,
        }
    }
}

impl UserStreak {
    /// A user with no recorded activity.
    #[must_use]
    pub const fn fresh(user_id: UserId) -> Self {
        Self {
            user_id,
            current_streak: 0,
            max_streak: 0,
            last_activity_date: None,
        }
    }

    /// Applies activity on `today`.
    ///
    /// Yesterday extends the streak, today leaves it alone, anything else
    /// (including a date in the future from clock skew) restarts it at 1.
    #[must_use]
    pub fn record_activity(&self, today: NaiveDate) -> StreakStep {
        let current = match self.last_activity_date {
            Some(last) if last == today => return StreakStep::SameDay(*self),
            Some(last) if today.pred_opt() == Some(last) => self.current_streak.saturating_add(1),
            _ => 1,
        };
        StreakStep::Advanced(Self {
            user_id: self.user_id,
            current_streak: current,
            max_streak: self.max_streak.max(current),
            last_activity_date: Some(today),
        })
    }
}

/// Milestone rule reached by a streak of exactly `current` days.
#[must_use]
pub const fn milestone(current: i32) -> Option<RuleKey> {
    match current {
        3 => Some(RuleKey::Streak3),
        7 => Some(RuleKey::Streak7),
        _ => None,
    }
}
