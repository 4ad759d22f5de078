//! Concurrent seat allocation engine.
//!
//! A [`SeatPool`] owns the seats of one vehicle instance. An
//! [`AllocationCoordinator`] decides which caller gets a seat, either under a
//! single lock ([`Strategy::Serialized`]) or deliberately without one
//! ([`Strategy::Unserialized`]). The [`SimulationHarness`] releases many
//! claimant threads at once against one pool and reports whether the pool's
//! final occupancy agrees with the claims that reported success.
//!
//! ```
//! use std::sync::Arc;
//! use seat_contention::{AllocationCoordinator, SeatPool, SimulationConfig, SimulationHarness, Strategy};
//!
//! let pool = Arc::new(SeatPool::default());
//! let harness = SimulationHarness::new(Arc::clone(&pool), Arc::new(AllocationCoordinator::new()));
//! let result = harness.run(&SimulationConfig::reference(Strategy::Serialized, &pool))?;
//! assert_eq!(result.final_reserved, 90);
//! assert!(result.invariant_held);
//! # Ok::<(), seat_contention::Error>(())
//! ```

pub mod coordinator;
pub mod error;
pub mod gate;
pub mod harness;
pub mod logging;
pub mod pool;
pub mod seat;
pub mod sim;
pub mod types;

pub use coordinator::AllocationCoordinator;
pub use error::{Error, LayoutError, ParseDesignatorError, Result, SimulationError};
pub use harness::{SimulationConfig, SimulationHarness, SimulationResult, TrialSummary};
pub use pool::{SeatLayout, SeatPool};
pub use seat::{Seat, SeatSnapshot};
pub use types::{AllocationAttempt, AttemptOutcome, ClaimOutcome, SeatClass, SeatDesignator, Strategy};
