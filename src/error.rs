//! Error types for the allocation engine.
//!
//! Only configuration problems and harness failures are errors. A seat that is
//! already taken, a designator that names no seat, or a pool that is full are
//! ordinary outcomes and are returned as values.

use std::time::Duration;

use thiserror::Error;

/// Invalid seat layout parameters, rejected when the pool is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("row count must be greater than zero")]
    NoRows,

    #[error("column count must be greater than zero")]
    NoColumns,

    #[error("column count {columns} exceeds the {max} lettered columns A-Z")]
    TooManyColumns { columns: u32, max: u32 },

    #[error("premium row count {premium_rows} exceeds row count {rows}")]
    PremiumRowsExceedRows { premium_rows: u32, rows: u32 },

    #[error("base price {price} must be a finite, non-negative amount")]
    InvalidBasePrice { price: f64 },
}

/// Text that does not name a seat, e.g. `"INVALID"` or `"0A"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseDesignatorError {
    #[error("seat designator is empty")]
    Empty,

    #[error("seat designator '{input}' has no valid row number")]
    InvalidRow { input: String },

    #[error("seat designator '{input}' must end in a column letter")]
    InvalidColumn { input: String },
}

/// Failures of the simulation harness itself (never of a claim).
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("a simulation needs at least one claimant")]
    NoClaimants,

    #[error("max attempts per claimant must be greater than zero")]
    ZeroMaxAttempts,

    #[error("a trial batch needs at least one trial")]
    NoTrials,

    #[error("failed to spawn claimant {claimant}: {source}")]
    Spawn {
        claimant: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("claimant {claimant} panicked")]
    ClaimantPanicked { claimant: usize },

    #[error("{remaining} claimant(s) still running after {timeout:?}")]
    CompletionTimeout { remaining: usize, timeout: Duration },
}

/// Top-level error for library callers and the CLI.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("failed to encode report: {0}")]
    Report(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
