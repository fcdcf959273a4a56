//! Batch-level properties
//!
//! Conflict rules, accumulator precedence, finalize idempotence and record
//! codec round trips, checked through the facade.

use crate::common::*;
use parastate::{transition_log, DeltaSequence, U256};
use proptest::prelude::*;

// ============================================================================
// Conflict rules
// ============================================================================

mod conflict_rules {
    use super::*;

    fn read(tx: TxId, path: &str) -> Univalue {
        Univalue::new(tx, path, 1, 0, 0, Some(Value::Int64(0)), true)
    }

    fn write(tx: TxId, path: &str) -> Univalue {
        Univalue::new(tx, path, 0, 1, 0, Some(Value::Int64(0)), true)
    }

    #[test]
    fn one_read_per_key_never_conflicts() {
        let batch: Vec<Univalue> = (0..10).map(|i| read(i, &format!("/k{}", i))).collect();
        assert!(Arbitrator::detect(&batch).is_empty());
    }

    #[test]
    fn pure_deltas_within_bounds_do_not_conflict() {
        let batch = vec![
            delta_record(1, "/c", 5, true, 0, 100),
            delta_record(2, "/c", 7, true, 0, 100),
        ];
        assert!(Arbitrator::detect(&batch).is_empty());
    }

    #[test]
    fn pure_deltas_over_bound_conflict_once() {
        let batch = vec![
            delta_record(1, "/c", 60, true, 0, 100),
            delta_record(2, "/c", 70, true, 0, 100),
        ];
        let conflicts = Arbitrator::detect(&batch);
        assert_eq!(conflicts.len(), 1);
        assert!(!conflicts[0].is_access());
    }

    #[test]
    fn write_conflicts_with_later_records() {
        for other in [read(2, "/k"), write(2, "/k"), delta_record(2, "/k", 1, true, 0, 9)] {
            let conflicts = Arbitrator::detect(&[write(1, "/k"), other]);
            assert_eq!(conflicts.len(), 1);
            assert!(conflicts[0].is_access());
            assert_eq!(conflicts[0].tx_ids(), &[2]);
        }
    }

    #[test]
    fn read_and_delta_conflict_in_either_order() {
        let pairs = [
            vec![read(1, "/c"), delta_record(2, "/c", 1, true, 0, 9)],
            vec![delta_record(1, "/c", 1, true, 0, 9), read(2, "/c")],
        ];
        for batch in pairs {
            let conflicts = Arbitrator::detect(&batch);
            assert_eq!(conflicts.len(), 1);
            assert!(conflicts[0].is_access());
        }
    }

    #[test]
    fn underflow_reported_before_overflow() {
        let batch = vec![
            delta_record(1, "/c", 8, true, 0, 10),
            delta_record(2, "/c", 8, true, 0, 10),
            delta_record(3, "/c", 4, false, 0, 10),
            delta_record(4, "/c", 4, false, 0, 10),
        ];
        let conflicts = Arbitrator::detect(&batch);
        let kinds: Vec<ConflictKind> = conflicts.iter().map(Conflict::kind).collect();
        assert_eq!(kinds, vec![ConflictKind::UnderflowLimit, ConflictKind::OverflowLimit]);
        assert_eq!(losers(&conflicts), vec![2, 4]);
    }
}

// ============================================================================
// Finalization
// ============================================================================

mod finalization {
    use super::*;

    #[test]
    fn finalize_is_idempotent() {
        let store = counter_store("/c", 3, 0, 100);
        let mut seq = DeltaSequence::load("/c", &*store).unwrap();
        seq.add(delta_record(2, "/c", 4, true, 0, 100));
        seq.add(delta_record(1, "/c", 1, false, 0, 100));
        seq.sort();
        let first = seq.finalize().unwrap().unwrap();
        assert_eq!(first.peek().and_then(Value::as_u64), Some(6));
        assert_eq!(seq.finalize().unwrap(), Some(first));
    }

    #[test]
    fn overflow_rejects_key_without_aborting_batch() {
        let store = counter_store("/c", 90, 0, 100);
        store.put("/other", &Value::Int64(0)).unwrap();
        // both deltas fit alone and together against zero, but not on top of 90
        let batch = vec![
            delta_record(1, "/c", 6, true, 0, 100),
            delta_record(2, "/c", 6, true, 0, 100),
            Univalue::new(3, "/other", 0, 1, 0, Some(Value::Int64(7)), true),
        ];
        let outcome = engine(store.clone()).process(batch).unwrap();
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].0, "/c");
        assert_eq!(store.retrieve("/c").unwrap().and_then(|v| v.as_u64()), Some(90));
        assert_eq!(store.retrieve("/other").unwrap(), Some(Value::Int64(7)));
    }
}

// ============================================================================
// Codec round trips
// ============================================================================

mod codec {
    use super::*;

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            prop::collection::vec("[a-z]{1,4}/?", 0..4).prop_map(|c| Value::Path(PathDir::with_children(c))),
            prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
            "[ -~]{0,12}".prop_map(Value::String),
            any::<i64>().prop_map(Value::Int64),
            (0u64..500, 500u64..1000).prop_map(|(v, max)| Value::u64(v, 0, max)),
            any::<u128>().prop_map(|v| Value::u256(U256::from(v), U256::ZERO, U256::MAX)),
        ]
    }

    proptest! {
        #[test]
        fn univalue_roundtrip(tx in 0u32..1000, value in arb_value(), preexists in any::<bool>()) {
            let record = Univalue::new(tx, "/k", 1, 1, 0, Some(value), preexists);
            let bytes = record.encode().unwrap();
            let (decoded, _) = Univalue::decode(&bytes).unwrap();
            prop_assert_eq!(decoded, record);
        }

        #[test]
        fn transition_log_roundtrip(values in prop::collection::vec(arb_value(), 0..12)) {
            let records: Vec<Univalue> = values
                .into_iter()
                .enumerate()
                .map(|(i, v)| Univalue::new(i as TxId, format!("/k{}", i), 0, 1, 0, Some(v), false))
                .collect();
            let bytes = transition_log::encode(&records).unwrap();
            prop_assert_eq!(transition_log::decode(&bytes).unwrap(), records);
        }
    }
}
