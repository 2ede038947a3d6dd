//! Service layer: business logic orchestration.
//!
//! [`BookingService`] owns the room-booking flows and [`RewardService`]
//! the episode-completion, points and streak flows. Both are stateless
//! coordinators over an injected [`crate::persistence::Store`] and
//! [`crate::domain::Clock`].

pub mod booking_service;
pub mod reward_service;

pub use booking_service::{BookingService, ReviewDecision};
pub use reward_service::{Completion, CompletionSummary, RewardService, RewardsSummary};

use crate::domain::{Profile, Reason, Verdict};
use crate::error::ApiError;
use crate::persistence::StoreError;

/// Why a flow stopped early: a business decline or a real failure.
///
/// Lets flow bodies use `?` on both [`Reason`] and [`StoreError`]; the
/// public methods split it back apart with [`settle`].
#[derive(Debug)]
pub(crate) enum Halt {
    Decline(Reason),
    Fail(ApiError),
}

impl From<Reason> for Halt {
    fn from(reason: Reason) -> Self {
        Self::Decline(reason)
    }
}

impl From<StoreError> for Halt {
    fn from(err: StoreError) -> Self {
        Self::Fail(ApiError::Store(err))
    }
}

pub(crate) fn settle<T>(result: Result<T, Halt>) -> Result<Verdict<T>, ApiError> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(Halt::Decline(reason)) => Ok(Err(reason)),
        Err(Halt::Fail(err)) => Err(err),
    }
}

/// Returns the caller's profile, declining with `USER_INACTIVE` when it is
/// missing or deactivated.
pub(crate) fn require_active(profile: Option<Profile>) -> Result<Profile, Halt> {
    match profile {
        Some(profile) if profile.is_active => Ok(profile),
        _ => Err(Halt::Decline(Reason::UserInactive)),
    }
}
