//! # roomly
//!
//! Booking and rewards backend for a corporate learning platform.
//!
//! Exposes the meeting-room booking functions (create, update, cancel,
//! review) and the episode-completion function that awards points and
//! maintains daily streaks. The relational store is the only shared state:
//! overlap prevention and idempotent point awards are enforced there.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP + Bearer JWT)
//!     │
//!     ├── Handlers, DTOs, extractors (api/)
//!     │
//!     ├── BookingService / RewardService (service/)
//!     ├── Rules, ids, clock (domain/)
//!     │
//!     └── Store trait (persistence/)
//!           ├── PostgresStore
//!           └── MemoryStore
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
