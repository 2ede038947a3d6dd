//! Data Transfer Objects for request/response serialization.
//!
//! Field names are camelCase on the wire.

pub mod booking_dto;
pub mod common_dto;
pub mod rewards_dto;

pub use booking_dto::*;
pub use common_dto::*;
pub use rewards_dto::*;
