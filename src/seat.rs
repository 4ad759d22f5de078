//! A single allocatable seat and its two-state reservation flag.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::types::{SeatClass, SeatDesignator};

/// One seat on one vehicle instance.
///
/// The reservation flag is a single atomic, so readers see either
/// `Available` or `Reserved` and never anything in between. `reserve` and
/// `release` are the only writers; deciding *whether* a caller may reserve is
/// the coordinator's job.
#[derive(Debug)]
pub struct Seat {
    designator: SeatDesignator,
    class: SeatClass,
    base_price: f64,
    reserved: AtomicBool,
}

/// Owned point-in-time view of a seat, safe to hand to renderers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeatSnapshot {
    pub designator: SeatDesignator,
    pub class: SeatClass,
    pub price: f64,
    pub reserved: bool,
}

impl Seat {
    /// Create an available seat.
    pub fn new(designator: SeatDesignator, class: SeatClass, base_price: f64) -> Self {
        Self {
            designator,
            class,
            base_price,
            reserved: AtomicBool::new(false),
        }
    }

    /// Mark the seat reserved. Unconditional; callers check availability first.
    pub fn reserve(&self) {
        self.reserved.store(true, Ordering::SeqCst);
    }

    /// Mark the seat available. Releasing an available seat is a no-op.
    pub fn release(&self) {
        self.reserved.store(false, Ordering::SeqCst);
    }

    pub fn is_reserved(&self) -> bool {
        self.reserved.load(Ordering::SeqCst)
    }

    pub fn designator(&self) -> SeatDesignator {
        self.designator
    }

    pub fn row(&self) -> u32 {
        self.designator.row()
    }

    pub fn column(&self) -> char {
        self.designator.column()
    }

    pub fn class(&self) -> SeatClass {
        self.class
    }

    pub fn base_price(&self) -> f64 {
        self.base_price
    }

    /// Base price scaled by the tier multiplier.
    pub fn price(&self) -> f64 {
        self.base_price * self.class.price_multiplier()
    }

    pub fn snapshot(&self) -> SeatSnapshot {
        SeatSnapshot {
            designator: self.designator,
            class: self.class,
            price: self.price(),
            reserved: self.is_reserved(),
        }
    }
}
