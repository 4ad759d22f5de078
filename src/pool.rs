//! Seat layouts and the pool of seats belonging to one vehicle instance.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::error::LayoutError;
use crate::seat::{Seat, SeatSnapshot};
use crate::types::{SeatClass, SeatDesignator};

// Reference aircraft: 30 rows of A-F, first five rows premium.
const DEFAULT_ROWS: u32 = 30;
const DEFAULT_COLUMNS: u32 = 6;
const DEFAULT_PREMIUM_ROWS: u32 = 5;
const DEFAULT_BASE_PRICE: f64 = 500.0;
const MAX_COLUMNS: u32 = 26;

/// Validated cabin layout used to build a [`SeatPool`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SeatLayout {
    rows: u32,
    columns: u32,
    premium_rows: u32,
    base_price: f64,
}

impl SeatLayout {
    /// Validate layout parameters; bad values fail here, not mid-run.
    pub fn new(
        rows: u32,
        columns: u32,
        premium_rows: u32,
        base_price: f64,
    ) -> Result<Self, LayoutError> {
        if rows == 0 {
            return Err(LayoutError::NoRows);
        }
        if columns == 0 {
            return Err(LayoutError::NoColumns);
        }
        if columns > MAX_COLUMNS {
            return Err(LayoutError::TooManyColumns {
                columns,
                max: MAX_COLUMNS,
            });
        }
        if premium_rows > rows {
            return Err(LayoutError::PremiumRowsExceedRows { premium_rows, rows });
        }
        if !base_price.is_finite() || base_price < 0.0 {
            return Err(LayoutError::InvalidBasePrice { price: base_price });
        }
        Ok(Self {
            rows,
            columns,
            premium_rows,
            base_price,
        })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn premium_rows(&self) -> u32 {
        self.premium_rows
    }

    pub fn base_price(&self) -> f64 {
        self.base_price
    }

    pub fn capacity(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    fn class_of_row(&self, row: u32) -> SeatClass {
        if row <= self.premium_rows {
            SeatClass::Premium
        } else {
            SeatClass::Standard
        }
    }
}

impl Default for SeatLayout {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            premium_rows: DEFAULT_PREMIUM_ROWS,
            base_price: DEFAULT_BASE_PRICE,
        }
    }
}

/// Every seat of one vehicle instance, in row-major order.
///
/// Seats are created once and never removed; only their flags change. All
/// list queries build a fresh `Vec` per call, so callers can iterate while
/// other threads keep reserving.
#[derive(Debug)]
pub struct SeatPool {
    layout: SeatLayout,
    seats: Vec<Arc<Seat>>,
    index: HashMap<SeatDesignator, usize>,
}

impl SeatPool {
    pub fn new(layout: SeatLayout) -> Self {
        let mut seats = Vec::with_capacity(layout.capacity());
        let mut index = HashMap::with_capacity(layout.capacity());
        for row in 1..=layout.rows {
            let class = layout.class_of_row(row);
            for column in 0..layout.columns {
                // Layout validation keeps rows >= 1 and columns <= 26.
                let Some(designator) = SeatDesignator::from_position(row, column) else {
                    continue;
                };
                index.insert(designator, seats.len());
                seats.push(Arc::new(Seat::new(designator, class, layout.base_price)));
            }
        }
        Self {
            layout,
            seats,
            index,
        }
    }

    /// Build a pool straight from raw layout parameters.
    pub fn with_layout(
        rows: u32,
        columns: u32,
        premium_rows: u32,
        base_price: f64,
    ) -> Result<Self, LayoutError> {
        SeatLayout::new(rows, columns, premium_rows, base_price).map(Self::new)
    }

    pub fn layout(&self) -> &SeatLayout {
        &self.layout
    }

    pub fn capacity(&self) -> usize {
        self.seats.len()
    }

    /// Look a seat up by designator text (`"15A"`, `"15a"`).
    ///
    /// Malformed or unknown designators return `None`.
    pub fn seat(&self, id: &str) -> Option<Arc<Seat>> {
        let designator = id.parse::<SeatDesignator>().ok()?;
        self.seat_by_designator(designator)
    }

    pub fn seat_by_designator(&self, designator: SeatDesignator) -> Option<Arc<Seat>> {
        self.index
            .get(&designator)
            .map(|&slot| Arc::clone(&self.seats[slot]))
    }

    pub fn all_seats(&self) -> Vec<Arc<Seat>> {
        self.seats.clone()
    }

    pub fn seats_of_tier(&self, class: SeatClass) -> Vec<Arc<Seat>> {
        self.collect_where(|seat| seat.class() == class)
    }

    pub fn available_seats(&self) -> Vec<Arc<Seat>> {
        self.collect_where(|seat| !seat.is_reserved())
    }

    pub fn available_seats_of_tier(&self, class: SeatClass) -> Vec<Arc<Seat>> {
        self.collect_where(|seat| seat.class() == class && !seat.is_reserved())
    }

    /// Owned snapshots of every seat, for rendering.
    pub fn snapshots(&self) -> Vec<SeatSnapshot> {
        self.seats.iter().map(|seat| seat.snapshot()).collect()
    }

    pub fn available_count(&self) -> usize {
        self.seats.iter().filter(|seat| !seat.is_reserved()).count()
    }

    pub fn reserved_count(&self) -> usize {
        self.seats.iter().filter(|seat| seat.is_reserved()).count()
    }

    /// `(available, reserved)` from a single scan of reserved flags.
    ///
    /// `available` is derived as `capacity - reserved`, so this pair cannot
    /// detect an accounting mismatch; compare `available_count` and
    /// `reserved_count` for that.
    pub fn occupancy(&self) -> (usize, usize) {
        let reserved = self.reserved_count();
        (self.capacity() - reserved, reserved)
    }

    /// Reserved share of the pool as a percentage (0-100).
    pub fn occupancy_rate(&self) -> f64 {
        if self.seats.is_empty() {
            return 0.0;
        }
        self.reserved_count() as f64 / self.capacity() as f64 * 100.0
    }

    /// False for reserved seats and for designators naming no seat.
    pub fn is_seat_available(&self, id: &str) -> bool {
        self.seat(id).is_some_and(|seat| !seat.is_reserved())
    }

    /// Pick uniformly among the seats available right now.
    pub fn random_available_seat<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Arc<Seat>> {
        self.available_seats().choose(rng).cloned()
    }

    /// Return every seat to available without recreating any.
    pub fn reset_all(&self) {
        for seat in &self.seats {
            seat.release();
        }
    }

    /// One line per row: `.` available, `x` reserved.
    pub fn seat_map(&self) -> Vec<String> {
        self.seats
            .chunks(self.layout.columns as usize)
            .map(|row| {
                row.iter()
                    .map(|seat| if seat.is_reserved() { 'x' } else { '.' })
                    .collect()
            })
            .collect()
    }

    fn collect_where(&self, keep: impl Fn(&Seat) -> bool) -> Vec<Arc<Seat>> {
        self.seats
            .iter()
            .filter(|seat| keep(seat))
            .cloned()
            .collect()
    }
}

impl Default for SeatPool {
    fn default() -> Self {
        Self::new(SeatLayout::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn reference_pool() -> SeatPool {
        SeatPool::with_layout(30, 6, 5, 500.0).expect("valid layout")
    }

    #[test]
    fn starts_fully_available() {
        let pool = reference_pool();
        assert_eq!(pool.capacity(), 180);
        assert_eq!(pool.available_count(), 180);
        assert_eq!(pool.reserved_count(), 0);
        assert_eq!(pool.all_seats().len(), 180);
    }

    #[test]
    fn rejects_invalid_layouts() {
        assert_eq!(SeatLayout::new(0, 6, 0, 1.0), Err(LayoutError::NoRows));
        assert_eq!(SeatLayout::new(3, 0, 0, 1.0), Err(LayoutError::NoColumns));
        assert_eq!(
            SeatLayout::new(3, 27, 0, 1.0),
            Err(LayoutError::TooManyColumns { columns: 27, max: 26 })
        );
        assert_eq!(
            SeatLayout::new(3, 6, 4, 1.0),
            Err(LayoutError::PremiumRowsExceedRows {
                premium_rows: 4,
                rows: 3
            })
        );
        assert!(matches!(
            SeatLayout::new(3, 6, 1, f64::NAN),
            Err(LayoutError::InvalidBasePrice { .. })
        ));
        assert!(SeatLayout::new(3, 6, 1, -1.0).is_err());
    }

    #[test]
    fn splits_tiers_by_leading_rows() {
        let pool = reference_pool();
        assert_eq!(pool.seats_of_tier(SeatClass::Premium).len(), 30);
        assert_eq!(pool.seats_of_tier(SeatClass::Standard).len(), 150);
        let five_a = pool.seat("5A").expect("seat exists");
        assert_eq!(five_a.class(), SeatClass::Premium);
        let six_a = pool.seat("6A").expect("seat exists");
        assert_eq!(six_a.class(), SeatClass::Standard);
    }

    #[test]
    fn lookup_returns_none_for_unknown_or_malformed() {
        let pool = reference_pool();
        assert!(pool.seat("99Z").is_none());
        assert!(pool.seat("31A").is_none());
        assert!(pool.seat("1G").is_none());
        assert!(pool.seat("INVALID").is_none());
        assert!(pool.seat("").is_none());
        let seat = pool.seat("10b").expect("lower-case lookup");
        assert_eq!(seat.designator().to_string(), "10B");
    }

    #[test]
    fn counts_follow_reservations() {
        let pool = reference_pool();
        for id in ["10A", "10B", "10C"] {
            pool.seat(id).expect("seat exists").reserve();
        }
        assert_eq!(pool.available_count(), 177);
        assert_eq!(pool.reserved_count(), 3);
        assert_eq!(pool.occupancy(), (177, 3));
        assert!(!pool.is_seat_available("10A"));
        assert!(pool.is_seat_available("11A"));
        assert!(!pool.is_seat_available("nope"));
        let available = pool.available_seats();
        assert_eq!(available.len(), 177);
        assert!(available.iter().all(|seat| !seat.is_reserved()));
    }

    #[test]
    fn occupancy_rate_is_a_percentage() {
        let pool = reference_pool();
        assert_eq!(pool.occupancy_rate(), 0.0);
        for row in 1..=3 {
            for column in ['A', 'B', 'C', 'D', 'E', 'F'] {
                pool.seat(&format!("{row}{column}"))
                    .expect("seat exists")
                    .reserve();
            }
        }
        assert!((pool.occupancy_rate() - 10.0).abs() < 0.01);
    }

    #[test]
    fn reset_all_restores_capacity() {
        let pool = reference_pool();
        pool.seat("5A").expect("seat exists").reserve();
        pool.seat("10B").expect("seat exists").reserve();
        pool.seat("10B").expect("seat exists").release();
        pool.seat("20F").expect("seat exists").reserve();
        pool.reset_all();
        assert_eq!(pool.available_count(), pool.capacity());
    }

    #[test]
    fn random_available_seat_skips_reserved_and_handles_full_pool() {
        let pool = SeatPool::with_layout(1, 3, 0, 10.0).expect("valid layout");
        let mut rng = StdRng::seed_from_u64(7);
        pool.seat("1A").expect("seat exists").reserve();
        pool.seat("1B").expect("seat exists").reserve();
        let pick = pool.random_available_seat(&mut rng).expect("one left");
        assert_eq!(pick.designator().to_string(), "1C");
        pick.reserve();
        assert!(pool.random_available_seat(&mut rng).is_none());
    }

    #[test]
    fn seat_map_marks_reserved_seats() {
        let pool = SeatPool::with_layout(2, 3, 1, 10.0).expect("valid layout");
        pool.seat("2B").expect("seat exists").reserve();
        assert_eq!(pool.seat_map(), vec!["...".to_string(), ".x.".to_string()]);
    }

    #[test]
    fn snapshots_stay_consistent_under_concurrent_reservation() {
        let pool = Arc::new(reference_pool());
        let writers = 4;
        let barrier = Arc::new(Barrier::new(writers + 1));
        let torn = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::new();
        for writer in 0..writers {
            let pool = Arc::clone(&pool);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for seat in pool.all_seats().iter().skip(writer).step_by(writers) {
                    seat.reserve();
                }
            }));
        }

        let reader = {
            let pool = Arc::clone(&pool);
            let barrier = Arc::clone(&barrier);
            let torn = Arc::clone(&torn);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..200 {
                    let (available, reserved) = pool.occupancy();
                    if available + reserved != pool.capacity() {
                        torn.store(true, Ordering::SeqCst);
                    }
                    // A snapshot must never contain a seat it was not built from.
                    let snapshot = pool.available_seats();
                    if snapshot.len() > pool.capacity() {
                        torn.store(true, Ordering::SeqCst);
                    }
                }
            })
        };

        for handle in handles {
            handle.join().expect("writer thread panicked");
        }
        reader.join().expect("reader thread panicked");
        assert!(!torn.load(Ordering::SeqCst));
        assert_eq!(pool.reserved_count(), 180);
    }
}
