//! Two-phase barrier: a start gate that releases every waiter at once, and a
//! completion latch the coordinator thread blocks on until all work is done.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GateState {
    Closed,
    Open,
    Aborted,
}

struct GateInner {
    state: GateState,
    waiting: usize,
}

/// Holds claimants until the harness opens it; then all proceed together.
pub struct StartGate {
    inner: Mutex<GateInner>,
    changed: Condvar,
}

impl StartGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                state: GateState::Closed,
                waiting: 0,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the gate opens. Returns `false` if it was aborted instead.
    pub fn wait(&self) -> bool {
        let mut guard = self.lock();
        guard.waiting += 1;
        // Wake anyone counting arrivals.
        self.changed.notify_all();
        loop {
            let state = guard.state;
            match state {
                GateState::Open => return true,
                GateState::Aborted => return false,
                GateState::Closed => {
                    guard = self
                        .changed
                        .wait(guard)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    /// Block until at least `count` threads have arrived at the gate.
    pub fn wait_for_arrivals(&self, count: usize) {
        let mut guard = self.lock();
        while guard.waiting < count && guard.state == GateState::Closed {
            guard = self
                .changed
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Release every current and future waiter.
    pub fn open(&self) {
        self.set_state(GateState::Open);
    }

    /// Release every waiter with a "do not proceed" signal.
    pub fn abort(&self) {
        self.set_state(GateState::Aborted);
    }

    /// Number of threads that have reached the gate so far.
    pub fn arrivals(&self) -> usize {
        self.lock().waiting
    }

    fn set_state(&self, state: GateState) {
        let mut guard = self.lock();
        if guard.state == GateState::Closed {
            guard.state = state;
        }
        self.changed.notify_all();
    }
}

impl Default for StartGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Countdown that unblocks waiters once every participant has finished.
pub struct CompletionLatch {
    remaining: Mutex<usize>,
    done: Condvar,
}

impl CompletionLatch {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            done: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.remaining.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one finished participant. Extra calls past zero are ignored.
    pub fn count_down(&self) {
        let mut guard = self.lock();
        if *guard > 0 {
            *guard -= 1;
            if *guard == 0 {
                self.done.notify_all();
            }
        }
    }

    pub fn remaining(&self) -> usize {
        *self.lock()
    }

    /// Block until the count reaches zero.
    pub fn wait(&self) {
        let mut guard = self.lock();
        while *guard > 0 {
            guard = self.done.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the count reaches zero or `timeout` elapses.
    ///
    /// Returns `true` if the count reached zero.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock();
        while *guard > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (next, _) = self
                .done
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            guard = next;
        }
        true
    }
}

/// Counts the latch down when dropped, including during a panic unwind.
pub struct CountDownOnDrop<'a>(pub &'a CompletionLatch);

impl Drop for CountDownOnDrop<'_> {
    fn drop(&mut self) {
        self.0.count_down();
    }
}
