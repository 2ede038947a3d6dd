//! Point rules, the transaction ledger, and wallets.
//!
//! Awards are idempotent by construction: every ledger row carries an
//! [`AwardKey`] and the store accepts at most one row per key. Callers
//! branch on [`AwardOutcome`] instead of inspecting a constraint error.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::booking::UnknownVariant;
use super::ids::UserId;

/// Keys of the configurable point rules, plus the booking ledger key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKey {
    /// Finishing an episode.
    EpisodeComplete,
    /// Finishing every published episode of a subject.
    SubjectComplete,
    /// Reaching a three-day activity streak.
    Streak3,
    /// Reaching a seven-day activity streak.
    Streak7,
    /// Points spent on (or refunded from) a room booking.
    BookingUse,
}

impl RuleKey {
    /// Ledger representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EpisodeComplete => "episode_complete",
            Self::SubjectComplete => "subject_complete",
            Self::Streak3 => "streak_3",
            Self::Streak7 => "streak_7",
            Self::BookingUse => "booking_use",
        }
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKey {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "episode_complete" => Ok(Self::EpisodeComplete),
            "subject_complete" => Ok(Self::SubjectComplete),
            "streak_3" => Ok(Self::Streak3),
            "streak_7" => Ok(Self::Streak7),
            "booking_use" => Ok(Self::BookingUse),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// What a ledger row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefType {
    /// An episode id.
    Episode,
    /// A subject id.
    Subject,
    /// A calendar date (`YYYY-MM-DD`) on which a streak milestone was reached.
    Streak,
    /// A booking id whose consumed points were returned.
    BookingRefund,
}

impl RefType {
    /// Ledger representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Episode => "episode",
            Self::Subject => "subject",
            Self::Streak => "streak",
            Self::BookingRefund => "booking_refund",
        }
    }
}

impl FromStr for RefType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "episode" => Ok(Self::Episode),
            "subject" => Ok(Self::Subject),
            "streak" => Ok(Self::Streak),
            "booking_refund" => Ok(Self::BookingRefund),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Admin-tunable rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointRule {
    /// Rule key.
    pub key: RuleKey,
    /// Points granted when the rule fires.
    pub points: i64,
    /// Inactive rules grant nothing.
    pub is_active: bool,
}

impl PointRule {
    /// Points this rule currently grants (`0` when inactive).
    #[must_use]
    pub const fn effective_points(&self) -> i64 {
        if self.is_active { self.points } else { 0 }
    }
}

/// Effective points of an optional rule; a missing rule grants nothing.
#[must_use]
pub fn rule_points(rule: Option<&PointRule>) -> i64 {
    rule.map_or(0, PointRule::effective_points)
}

/// De-duplication key of a ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AwardKey {
    /// Beneficiary.
    pub user_id: UserId,
    /// Rule that produced the row.
    pub rule_key: RuleKey,
    /// Kind of referenced entity.
    pub ref_type: RefType,
    /// Referenced entity (uuid or date string).
    pub ref_id: String,
}

impl AwardKey {
    /// Convenience constructor.
    #[must_use]
    pub fn new(user_id: UserId, rule_key: RuleKey, ref_type: RefType, ref_id: impl Into<String>) -> Self {
        Self {
            user_id,
            rule_key,
            ref_type,
            ref_id: ref_id.into(),
        }
    }
}

/// Outcome of attempting to write a keyed ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardOutcome {
    /// The row was written and the wallet credited.
    Inserted,
    /// A row with the same key exists; nothing was written.
    AlreadyExists,
}

/// Immutable ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointTransaction {
    /// Row identifier.
    pub id: i64,
    /// De-duplication key.
    pub key: AwardKey,
    /// Signed amount.
    pub points: i64,
    /// Write instant.
    pub created_at: DateTime<Utc>,
}

/// Cached per-user aggregate of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wallet {
    /// Owner.
    pub user_id: UserId,
    /// Running total.
    pub total_points: i64,
    /// Display level.
    pub level: i32,
}

impl Wallet {
    /// Level assigned to freshly created wallets.
    pub const DEFAULT_LEVEL: i32 = 1;

    /// Wallet reported for users who have never earned points.
    #[must_use]
    pub const fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            total_points: 0,
            level: Self::DEFAULT_LEVEL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_rule_grants_nothing() {
        let mut rule = PointRule {
            key: RuleKey::EpisodeComplete,
            points: 10,
            is_active: true,
        };
        assert_eq!(rule.effective_points(), 10);
        rule.is_active = false;
        assert_eq!(rule.effective_points(), 0);
        assert_eq!(rule_points(None), 0);
    }

    #[test]
    fn keys_round_trip_through_strings() {
        for key in [
            RuleKey::EpisodeComplete,
            RuleKey::SubjectComplete,
            RuleKey::Streak3,
            RuleKey::Streak7,
            RuleKey::BookingUse,
        ] {
            assert_eq!(key.as_str().parse::<RuleKey>(), Ok(key));
        }
        for ref_type in [
            RefType::Episode,
            RefType::Subject,
            RefType::Streak,
            RefType::BookingRefund,
        ] {
            assert_eq!(ref_type.as_str().parse::<RefType>(), Ok(ref_type));
        }
    }
}
