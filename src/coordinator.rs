//! The single place that decides whether a caller gets a seat.
//!
//! Two paths share one signature. `claim_serialized` performs check-then-set
//! under one coordinator-wide lock and never grants a seat twice.
//! `claim_unserialized` runs the same steps with no lock and a widened race
//! window; it is kept as a negative example and can grant one seat to several
//! callers (a lost update).

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::trace;

use crate::seat::Seat;
use crate::types::{ClaimOutcome, Strategy};

/// Default pause between the first check and the re-check on the
/// unserialized path.
pub const DEFAULT_RACE_WINDOW: Duration = Duration::from_millis(2);

/// Serializes seat claims behind one coarse lock.
///
/// The lock guards every seat reachable through this coordinator, so all
/// serialized claims and releases funnel through one choke point.
pub struct AllocationCoordinator {
    lock: Mutex<()>,
    race_window: Duration,
}

impl AllocationCoordinator {
    pub fn new() -> Self {
        Self::with_race_window(DEFAULT_RACE_WINDOW)
    }

    /// Coordinator whose unserialized path sleeps for `race_window`.
    pub fn with_race_window(race_window: Duration) -> Self {
        Self {
            lock: Mutex::new(()),
            race_window,
        }
    }

    pub fn race_window(&self) -> Duration {
        self.race_window
    }

    // The guarded value is `()`, so a poisoned lock carries no broken state.
    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim via the path named by `strategy`.
    pub fn claim(&self, seat: &Seat, strategy: Strategy) -> ClaimOutcome {
        match strategy {
            Strategy::Serialized => self.claim_serialized(seat),
            Strategy::Unserialized => self.claim_unserialized(seat),
        }
    }

    /// Check-then-set under the coordinator lock.
    ///
    /// For any seat, at most one call returns `Claimed` until the seat is
    /// released again.
    pub fn claim_serialized(&self, seat: &Seat) -> ClaimOutcome {
        let _guard = self.guard();
        if seat.is_reserved() {
            trace!(seat = %seat.designator(), "serialized claim refused");
            return ClaimOutcome::Conflict;
        }
        seat.reserve();
        trace!(seat = %seat.designator(), "serialized claim granted");
        ClaimOutcome::Claimed
    }

    /// Check, wait, re-check, then set, with no lock held.
    ///
    /// The success value is the availability seen by the *first* read, so two
    /// racing callers can both report `Claimed` for the same seat.
    pub fn claim_unserialized(&self, seat: &Seat) -> ClaimOutcome {
        let was_available = !seat.is_reserved();

        if !self.race_window.is_zero() {
            thread::sleep(self.race_window);
        }

        if seat.is_reserved() {
            trace!(seat = %seat.designator(), "unserialized claim saw conflict on re-check");
            return ClaimOutcome::Conflict;
        }

        // Lost updates happen between this re-check and the set below.
        thread::yield_now();
        seat.reserve();

        if was_available {
            ClaimOutcome::Claimed
        } else {
            ClaimOutcome::Conflict
        }
    }

    /// Cancel a reservation under the coordinator lock.
    ///
    /// Returns `true` if the seat was reserved; releasing an available seat
    /// leaves it available and returns `false`.
    pub fn release_serialized(&self, seat: &Seat) -> bool {
        let _guard = self.guard();
        let was_reserved = seat.is_reserved();
        seat.release();
        was_reserved
    }
}

impl Default for AllocationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
