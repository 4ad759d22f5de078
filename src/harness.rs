//! Load-test harness: many concurrent claimants, one seat pool, one verdict.
//!
//! A run resets the pool, parks `N` named claimant threads on a start gate,
//! opens the gate once every claimant has arrived, and waits on a completion
//! latch. Each claimant picks a random seat from a fresh snapshot of the
//! available seats and claims it through the coordinator, re-selecting after a
//! lost race. The tally compares the pool's final occupancy with the number of
//! claims that reported success.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{Span, debug, info, info_span, warn};

use crate::coordinator::AllocationCoordinator;
use crate::error::SimulationError;
use crate::gate::{CompletionLatch, CountDownOnDrop, StartGate};
use crate::pool::SeatPool;
use crate::types::{AllocationAttempt, AttemptOutcome, ClaimantId, SeatDesignator, Strategy};

/// Parameters of one simulation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    pub strategy: Strategy,
    pub claimants: usize,
    /// Claim calls a claimant may make before giving up; `None` retries until
    /// it wins a seat or the pool is full.
    pub max_attempts: Option<usize>,
    /// Seeds claimant `i`'s seat choices with `seed + i`.
    pub seed: Option<u64>,
    /// Fail the run if claimants are still busy after this long.
    pub completion_timeout: Option<Duration>,
}

impl SimulationConfig {
    pub fn new(strategy: Strategy, claimants: usize) -> Self {
        Self {
            strategy,
            claimants,
            max_attempts: None,
            seed: None,
            completion_timeout: None,
        }
    }

    /// Reference scenario: half the pool's capacity in claimants.
    pub fn reference(strategy: Strategy, pool: &SeatPool) -> Self {
        Self::new(strategy, (pool.capacity() / 2).max(1))
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = Some(timeout);
        self
    }

    fn validate(&self) -> Result<(), SimulationError> {
        if self.claimants == 0 {
            return Err(SimulationError::NoClaimants);
        }
        if self.max_attempts == Some(0) {
            return Err(SimulationError::ZeroMaxAttempts);
        }
        Ok(())
    }

    // Distinct seed stream per trial so repeated runs do not replay choices.
    fn for_trial(&self, trial: usize) -> Self {
        let mut config = self.clone();
        config.seed = self.seed.map(|seed| seed.wrapping_add((trial as u64) << 32));
        config
    }
}

/// Aggregate outcome of one run. Computed once, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationResult {
    pub strategy: Strategy,
    pub total_claimants: usize,
    /// Claimants whose claim reported success.
    pub successful_claims: usize,
    /// Claimants that lost every race they entered.
    pub conflicts: usize,
    /// Failed claim calls across all claimants, including ones later retried.
    pub contended_claims: usize,
    /// Claimants that found no available seat before their first claim.
    pub no_seat_available: usize,
    pub final_reserved: usize,
    pub final_available: usize,
    pub capacity: usize,
    pub expected_reserved: usize,
    /// Reserved seats match reported successes and the pool adds up.
    pub invariant_held: bool,
    pub elapsed_ms: f64,
}

impl SimulationResult {
    fn tally(
        config: &SimulationConfig,
        pool: &SeatPool,
        attempts: &[AllocationAttempt],
        elapsed_ms: f64,
    ) -> Self {
        let count = |outcome: AttemptOutcome| attempts.iter().filter(|a| a.outcome == outcome).count();
        let successful_claims = count(AttemptOutcome::Claimed);
        let claim_calls: usize = attempts.iter().map(|a| a.attempts).sum();
        let final_reserved = pool.reserved_count();
        let final_available = pool.available_count();
        let capacity = pool.capacity();
        Self {
            strategy: config.strategy,
            total_claimants: config.claimants,
            successful_claims,
            conflicts: count(AttemptOutcome::Conflict),
            contended_claims: claim_calls.saturating_sub(successful_claims),
            no_seat_available: count(AttemptOutcome::NoSeatAvailable),
            final_reserved,
            final_available,
            capacity,
            expected_reserved: config.claimants.min(capacity),
            invariant_held: final_reserved == successful_claims
                && final_reserved + final_available == capacity,
            elapsed_ms,
        }
    }

    /// Successes that did not leave a reserved seat behind.
    pub fn lost_updates(&self) -> usize {
        self.successful_claims.saturating_sub(self.final_reserved)
    }

    /// Final reserved count equals `min(claimants, capacity)`.
    pub fn matches_expected(&self) -> bool {
        self.final_reserved == self.expected_reserved
    }
}

/// Roll-up of repeated runs with one configuration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialSummary {
    pub strategy: Strategy,
    pub claimants: usize,
    pub trials: usize,
    pub invariant_violations: usize,
    pub expected_mismatches: usize,
    pub total_lost_updates: usize,
    pub total_conflicts: usize,
    pub total_contended_claims: usize,
    pub min_reserved: usize,
    pub max_reserved: usize,
    /// Index of the first trial whose invariant check failed.
    pub first_violation: Option<usize>,
    pub elapsed_ms: f64,
}

impl TrialSummary {
    fn new(config: &SimulationConfig) -> Self {
        Self {
            strategy: config.strategy,
            claimants: config.claimants,
            trials: 0,
            invariant_violations: 0,
            expected_mismatches: 0,
            total_lost_updates: 0,
            total_conflicts: 0,
            total_contended_claims: 0,
            min_reserved: usize::MAX,
            max_reserved: 0,
            first_violation: None,
            elapsed_ms: 0.0,
        }
    }

    fn record(&mut self, result: &SimulationResult) {
        if !result.invariant_held {
            self.invariant_violations += 1;
            if self.first_violation.is_none() {
                self.first_violation = Some(self.trials);
            }
        }
        if !result.matches_expected() {
            self.expected_mismatches += 1;
        }
        self.total_lost_updates += result.lost_updates();
        self.total_conflicts += result.conflicts;
        self.total_contended_claims += result.contended_claims;
        self.min_reserved = self.min_reserved.min(result.final_reserved);
        self.max_reserved = self.max_reserved.max(result.final_reserved);
        self.elapsed_ms += result.elapsed_ms;
        self.trials += 1;
    }

    pub fn all_held(&self) -> bool {
        self.invariant_violations == 0
    }
}

type ClaimantWork = Box<dyn FnOnce() -> AllocationAttempt + Send>;

/// Drives claimants against one shared pool through one coordinator.
pub struct SimulationHarness {
    pool: Arc<SeatPool>,
    coordinator: Arc<AllocationCoordinator>,
}

impl SimulationHarness {
    pub fn new(pool: Arc<SeatPool>, coordinator: Arc<AllocationCoordinator>) -> Self {
        Self { pool, coordinator }
    }

    pub fn pool(&self) -> &Arc<SeatPool> {
        &self.pool
    }

    pub fn coordinator(&self) -> &Arc<AllocationCoordinator> {
        &self.coordinator
    }

    /// Run once and return the aggregate result.
    pub fn run(&self, config: &SimulationConfig) -> Result<SimulationResult, SimulationError> {
        self.run_with_attempts(config).map(|(result, _)| result)
    }

    /// Run once and also return every claimant's own record.
    pub fn run_with_attempts(
        &self,
        config: &SimulationConfig,
    ) -> Result<(SimulationResult, Vec<AllocationAttempt>), SimulationError> {
        self.run_spawning(config, |_, builder, work| builder.spawn(work))
    }

    fn run_spawning<S>(
        &self,
        config: &SimulationConfig,
        mut spawn: S,
    ) -> Result<(SimulationResult, Vec<AllocationAttempt>), SimulationError>
    where
        S: FnMut(ClaimantId, thread::Builder, ClaimantWork) -> io::Result<JoinHandle<AllocationAttempt>>,
    {
        config.validate()?;
        let _span = info_span!(
            "simulation",
            strategy = %config.strategy,
            claimants = config.claimants
        )
        .entered();

        self.pool.reset_all();
        let gate = Arc::new(StartGate::new());
        let latch = Arc::new(CompletionLatch::new(config.claimants));
        let stop_flag = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(config.claimants);
        for id in 0..config.claimants {
            let claimant = Claimant {
                id,
                pool: Arc::clone(&self.pool),
                coordinator: Arc::clone(&self.coordinator),
                strategy: config.strategy,
                max_attempts: config.max_attempts,
                rng: claimant_rng(config.seed, id),
                stop_flag: Arc::clone(&stop_flag),
            };
            let claimant_gate = Arc::clone(&gate);
            let claimant_latch = Arc::clone(&latch);
            let span = Span::current();
            let work: ClaimantWork = Box::new(move || {
                let _entered = span.entered();
                let _done = CountDownOnDrop(&claimant_latch);
                if !claimant_gate.wait() {
                    return claimant.finish(None, AttemptOutcome::Aborted, 0);
                }
                claimant.run()
            });
            let builder = thread::Builder::new().name(format!("claimant-{id}"));
            match spawn(id, builder, work) {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    // Parked claimants exit without touching the pool.
                    gate.abort();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(SimulationError::Spawn {
                        claimant: id,
                        source,
                    });
                }
            }
        }

        gate.wait_for_arrivals(config.claimants);
        debug!("all claimants parked, opening start gate");
        let start = Instant::now();
        gate.open();

        match config.completion_timeout {
            Some(timeout) => {
                if !latch.wait_timeout(timeout) {
                    let remaining = latch.remaining();
                    warn!(remaining, ?timeout, "claimants did not finish in time");
                    // Stragglers must not touch the pool once the run has failed.
                    stop_flag.store(true, Ordering::SeqCst);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(SimulationError::CompletionTimeout { remaining, timeout });
                }
            }
            None => latch.wait(),
        }
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut attempts = Vec::with_capacity(handles.len());
        for (claimant, handle) in handles.into_iter().enumerate() {
            let attempt = handle
                .join()
                .map_err(|_| SimulationError::ClaimantPanicked { claimant })?;
            attempts.push(attempt);
        }

        let result = SimulationResult::tally(config, &self.pool, &attempts, elapsed_ms);
        info!(
            successful = result.successful_claims,
            conflicts = result.conflicts,
            contended = result.contended_claims,
            reserved = result.final_reserved,
            available = result.final_available,
            invariant_held = result.invariant_held,
            elapsed_ms = result.elapsed_ms,
            "simulation finished"
        );
        if !result.invariant_held {
            warn!(
                lost_updates = result.lost_updates(),
                successful = result.successful_claims,
                reserved = result.final_reserved,
                "pool invariant violated"
            );
        }
        Ok((result, attempts))
    }

    /// Repeat the same configuration `trials` times and summarize.
    pub fn run_trials(
        &self,
        config: &SimulationConfig,
        trials: usize,
    ) -> Result<TrialSummary, SimulationError> {
        if trials == 0 {
            return Err(SimulationError::NoTrials);
        }
        let mut summary = TrialSummary::new(config);
        for trial in 0..trials {
            let result = self.run(&config.for_trial(trial))?;
            summary.record(&result);
        }
        Ok(summary)
    }

    /// Repeat until a run breaks the invariant; `None` if none did.
    pub fn find_violation(
        &self,
        config: &SimulationConfig,
        max_trials: usize,
    ) -> Result<Option<(usize, SimulationResult)>, SimulationError> {
        for trial in 0..max_trials {
            let result = self.run(&config.for_trial(trial))?;
            if !result.invariant_held {
                return Ok(Some((trial, result)));
            }
        }
        Ok(None)
    }
}

fn claimant_rng(seed: Option<u64>, id: ClaimantId) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id as u64)),
        None => StdRng::from_entropy(),
    }
}

/// One concurrent unit of work trying to end up holding a seat.
struct Claimant {
    id: ClaimantId,
    pool: Arc<SeatPool>,
    coordinator: Arc<AllocationCoordinator>,
    strategy: Strategy,
    max_attempts: Option<usize>,
    rng: StdRng,
    stop_flag: Arc<AtomicBool>,
}

impl Claimant {
    fn run(mut self) -> AllocationAttempt {
        let mut attempts = 0usize;
        let mut last_seat = None;
        loop {
            if self.stop_flag.load(Ordering::SeqCst) {
                debug!(claimant = self.id, attempts, "cancelled");
                return self.finish(last_seat, AttemptOutcome::Aborted, attempts);
            }
            if self.max_attempts.is_some_and(|max| attempts >= max) {
                debug!(claimant = self.id, attempts, "giving up after lost races");
                return self.finish(last_seat, AttemptOutcome::Conflict, attempts);
            }
            // Fresh snapshot each time: another claimant may pick the same seat.
            let Some(seat) = self.pool.random_available_seat(&mut self.rng) else {
                let outcome = if attempts == 0 {
                    AttemptOutcome::NoSeatAvailable
                } else {
                    AttemptOutcome::Conflict
                };
                debug!(claimant = self.id, attempts, ?outcome, "pool full");
                return self.finish(last_seat, outcome, attempts);
            };

            attempts += 1;
            last_seat = Some(seat.designator());
            if self.coordinator.claim(&seat, self.strategy).is_claimed() {
                debug!(claimant = self.id, seat = %seat.designator(), attempts, "claimed");
                return self.finish(last_seat, AttemptOutcome::Claimed, attempts);
            }
            debug!(claimant = self.id, seat = %seat.designator(), attempts, "lost race");
        }
    }

    fn finish(
        &self,
        seat: Option<SeatDesignator>,
        outcome: AttemptOutcome,
        attempts: usize,
    ) -> AllocationAttempt {
        AllocationAttempt {
            claimant: self.id,
            seat,
            outcome,
            strategy: self.strategy,
            attempts,
        }
    }
}
