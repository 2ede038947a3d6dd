//! Domain layer: identifiers, entities and the pure business rules.
//!
//! Nothing in here performs I/O. Booking windows, completion, streak and
//! point-rule logic are plain functions over plain values so the service
//! layer only has to sequence store calls around them.

pub mod booking;
pub mod clock;
pub mod ids;
pub mod points;
pub mod profile;
pub mod progress;
pub mod reason;
pub mod streak;

pub use booking::{
    Booking, BookingDraft, BookingPatch, BookingStatus, NewBooking, Room, RoomBlock, RoomStatus,
    TimeRange,
};
pub use clock::{BusinessCalendar, Clock, FixedClock, SystemClock};
pub use ids::{BookingId, EpisodeId, RoomId, SubjectId, UserId};
pub use points::{AwardKey, AwardOutcome, PointRule, PointTransaction, RefType, RuleKey, Wallet};
pub use profile::{Profile, Role};
pub use progress::{Episode, EpisodeProgress, EpisodeStatus, SubjectCompletion};
pub use reason::{Reason, Verdict};
pub use streak::{StreakStep, UserStreak};
