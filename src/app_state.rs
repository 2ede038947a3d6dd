//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::api::auth::JwtVerifier;
use crate::domain::{BusinessCalendar, Clock};
use crate::persistence::Store;
use crate::service::{BookingService, RewardService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Booking flows.
    pub bookings: Arc<BookingService>,
    /// Completion, points and streak flows.
    pub rewards: Arc<RewardService>,
    /// Store handle, used directly by the health check.
    pub store: Arc<dyn Store>,
    /// Bearer token verifier.
    pub auth: Arc<JwtVerifier>,
}

impl AppState {
    /// Wires the services over one store and clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        calendar: BusinessCalendar,
        auth: JwtVerifier,
    ) -> Self {
        Self {
            bookings: Arc::new(BookingService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                calendar,
            )),
            rewards: Arc::new(RewardService::new(Arc::clone(&store), clock, calendar)),
            store,
            auth: Arc::new(auth),
        }
    }
}
