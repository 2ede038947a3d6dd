//! Reward service: episode completion, point awards and streaks.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::points::rule_points;
use crate::domain::streak::milestone;
use crate::domain::{
    AwardKey, AwardOutcome, BusinessCalendar, Clock, EpisodeId, EpisodeProgress, Reason, RefType,
    RuleKey, StreakStep, UserId, UserStreak, Verdict, Wallet,
};
use crate::error::ApiError;
use crate::persistence::Store;

use super::{Halt, require_active, settle};

/// Points granted by one `complete-episode` call and the resulting streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompletionSummary {
    /// Points for the episode itself; `0` on repeat calls.
    pub gained_episode_points: i64,
    /// Points for finishing the whole subject.
    pub gained_subject_points: i64,
    /// Points for hitting a streak milestone today.
    pub gained_streak_points: i64,
    /// Streak after this call.
    pub current_streak: i32,
    /// Longest streak after this call.
    pub max_streak: i32,
}

/// Outcome of a completion request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The episode counts as completed; awards were attempted.
    Completed(CompletionSummary),
    /// Progress is below the completion threshold.
    NotComplete {
        /// Current watched percentage (`0` without a progress row).
        watched_percent: i32,
    },
}

/// Read-only view of a user's wallet and streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardsSummary {
    /// Wallet balance.
    pub total_points: i64,
    /// Wallet level.
    pub level: i32,
    /// Current streak.
    pub current_streak: i32,
    /// Longest streak.
    pub max_streak: i32,
    /// Last recorded activity day.
    pub last_activity_date: Option<NaiveDate>,
}

/// Coordinates completion, ledger awards and streak bookkeeping.
///
/// Every award goes through [`Store::award_points`], which writes the keyed
/// ledger row and the wallet credit together, so repeated or concurrent
/// calls never double-credit.
#[derive(Debug, Clone)]
pub struct RewardService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    calendar: BusinessCalendar,
}

impl RewardService {
    /// Creates a new `RewardService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, calendar: BusinessCalendar) -> Self {
        Self {
            store,
            clock,
            calendar,
        }
    }

    /// Records completion of `episode_id` by `user_id` and awards points.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on store failures; business declines come back
    /// as `Ok(Err(reason))`.
    pub async fn complete_episode(
        &self,
        user_id: UserId,
        episode_id: EpisodeId,
    ) -> Result<Verdict<Completion>, ApiError> {
        settle(self.try_complete_episode(user_id, episode_id).await)
    }

    async fn try_complete_episode(
        &self,
        user_id: UserId,
        episode_id: EpisodeId,
    ) -> Result<Completion, Halt> {
        let now = self.clock.now();
        require_active(self.store.profile(user_id).await?)?;
        let episode = self
            .store
            .episode(episode_id)
            .await?
            .ok_or(Reason::EpisodeNotFound)?;

        let progress = self
            .store
            .progress(user_id, episode_id)
            .await?
            .unwrap_or(EpisodeProgress {
                user_id,
                episode_id,
                watched_percent: 0,
                completed_at: None,
            });
        if !progress.is_complete() {
            return Ok(Completion::NotComplete {
                watched_percent: progress.watched_percent,
            });
        }
        if progress.completed_at.is_none() {
            self.store.mark_completed(user_id, episode_id, now).await?;
        }

        let episode_points = match episode.points_reward {
            Some(points) => points,
            None => self.rule(RuleKey::EpisodeComplete).await?,
        };
        let gained_episode_points = self
            .award(
                AwardKey::new(
                    user_id,
                    RuleKey::EpisodeComplete,
                    RefType::Episode,
                    episode_id.to_string(),
                ),
                episode_points,
            )
            .await?;

        let mut gained_subject_points = 0;
        if self
            .store
            .subject_completion(user_id, episode.subject_id)
            .await?
            .is_complete()
        {
            let points = self.rule(RuleKey::SubjectComplete).await?;
            gained_subject_points = self
                .award(
                    AwardKey::new(
                        user_id,
                        RuleKey::SubjectComplete,
                        RefType::Subject,
                        episode.subject_id.to_string(),
                    ),
                    points,
                )
                .await?;
        }

        let today = self.calendar.date_of(now);
        let previous = self
            .store
            .streak(user_id)
            .await?
            .unwrap_or_else(|| UserStreak::fresh(user_id));
        let step = previous.record_activity(today);
        let mut gained_streak_points = 0;
        if let StreakStep::Advanced(streak) = step {
            self.store.save_streak(&streak).await?;
            if let Some(rule_key) = milestone(streak.current_streak) {
                let points = self.rule(rule_key).await?;
                gained_streak_points = self
                    .award(
                        AwardKey::new(user_id, rule_key, RefType::Streak, today.to_string()),
                        points,
                    )
                    .await?;
            }
        }
        let streak = step.streak();

        tracing::info!(
            %user_id,
            %episode_id,
            gained_episode_points,
            gained_subject_points,
            gained_streak_points,
            current_streak = streak.current_streak,
            "episode completion recorded"
        );

        Ok(Completion::Completed(CompletionSummary {
            gained_episode_points,
            gained_subject_points,
            gained_streak_points,
            current_streak: streak.current_streak,
            max_streak: streak.max_streak,
        }))
    }

    /// Returns the caller's wallet and streak, with defaults for users who
    /// have earned nothing yet.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on store failures.
    pub async fn summary(&self, user_id: UserId) -> Result<RewardsSummary, ApiError> {
        let wallet = self
            .store
            .wallet(user_id)
            .await?
            .unwrap_or_else(|| Wallet::empty(user_id));
        let streak = self
            .store
            .streak(user_id)
            .await?
            .unwrap_or_else(|| UserStreak::fresh(user_id));
        Ok(RewardsSummary {
            total_points: wallet.total_points,
            level: wallet.level,
            current_streak: streak.current_streak,
            max_streak: streak.max_streak,
            last_activity_date: streak.last_activity_date,
        })
    }

    async fn rule(&self, key: RuleKey) -> Result<i64, Halt> {
        Ok(rule_points(self.store.point_rule(key).await?.as_ref()))
    }

    /// Writes the ledger row and credits the wallet; returns the points
    /// actually gained.
    async fn award(&self, key: AwardKey, points: i64) -> Result<i64, Halt> {
        if points <= 0 {
            return Ok(0);
        }
        match self.store.award_points(&key, points).await? {
            AwardOutcome::Inserted => {
                tracing::debug!(
                    user_id = %key.user_id,
                    rule = %key.rule_key,
                    ref_id = %key.ref_id,
                    points,
                    "points awarded"
                );
                Ok(points)
            }
            AwardOutcome::AlreadyExists => Ok(0),
        }
    }
}
