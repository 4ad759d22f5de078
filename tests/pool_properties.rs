//! Property tests for the seat pool's accounting.

use proptest::prelude::*;

use seat_contention::{AllocationCoordinator, SeatClass, SeatPool};

#[derive(Clone, Debug)]
enum Op {
    Reserve(usize),
    Release(usize),
    Claim(usize),
    Cancel(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..64).prop_map(Op::Reserve),
        (0usize..64).prop_map(Op::Release),
        (0usize..64).prop_map(Op::Claim),
        (0usize..64).prop_map(Op::Cancel),
    ]
}

proptest! {
    #[test]
    fn available_plus_reserved_is_capacity(
        rows in 1u32..8,
        columns in 1u32..8,
        ops in prop::collection::vec(op(), 0..80),
    ) {
        let pool = SeatPool::with_layout(rows, columns, rows / 2, 100.0).expect("valid layout");
        let coordinator = AllocationCoordinator::new();
        let seats = pool.all_seats();
        for op in ops {
            match op {
                Op::Reserve(i) => seats[i % seats.len()].reserve(),
                Op::Release(i) => seats[i % seats.len()].release(),
                Op::Claim(i) => {
                    coordinator.claim_serialized(&seats[i % seats.len()]);
                }
                Op::Cancel(i) => {
                    coordinator.release_serialized(&seats[i % seats.len()]);
                }
            }
            prop_assert_eq!(pool.available_count() + pool.reserved_count(), pool.capacity());
        }

        pool.reset_all();
        prop_assert_eq!(pool.available_count(), pool.capacity());
        prop_assert_eq!(pool.reserved_count(), 0);
    }

    #[test]
    fn layout_fixes_capacity_and_tiers(
        rows in 1u32..40,
        columns in 1u32..=26,
        premium in 0u32..40,
    ) {
        let premium_rows = premium.min(rows);
        let pool = SeatPool::with_layout(rows, columns, premium_rows, 250.0).expect("valid layout");
        let per_row = columns as usize;
        prop_assert_eq!(pool.capacity(), rows as usize * per_row);
        prop_assert_eq!(pool.seats_of_tier(SeatClass::Premium).len(), premium_rows as usize * per_row);
        prop_assert_eq!(
            pool.seats_of_tier(SeatClass::Standard).len(),
            (rows - premium_rows) as usize * per_row
        );
        for seat in pool.all_seats() {
            let text = seat.designator().to_string();
            let found = pool.seat(&text.to_lowercase()).expect("designator resolves");
            prop_assert_eq!(found.designator(), seat.designator());
        }
    }

    #[test]
    fn claim_once_then_conflict(index in 0usize..180) {
        let pool = SeatPool::default();
        let coordinator = AllocationCoordinator::new();
        let seats = pool.all_seats();
        let seat = &seats[index];
        prop_assert!(coordinator.claim_serialized(seat).is_claimed());
        prop_assert!(!coordinator.claim_serialized(seat).is_claimed());
        prop_assert_eq!(pool.reserved_count(), 1);
    }
}
