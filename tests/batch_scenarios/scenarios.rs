//! Reference scenarios
//!
//! - A: two full writes of a new key
//! - B: bounded counter pushed past its maximum by delta writes
//! - C: directory created with children, exported and re-imported

use crate::common::*;
use parastate::transition_log;

// ============================================================================
// Scenario A: write-write on a new key
// ============================================================================

#[test]
fn scenario_a_two_writes_one_conflict() {
    let store = rooted_store();
    let mut batch = execute(&store, 1, |c| c.write(1, "/k", Some(Value::Int64(1))).unwrap());
    batch.extend(execute(&store, 2, |c| c.write(2, "/k", Some(Value::Int64(2))).unwrap()));

    let conflicts = Arbitrator::detect(&batch);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].key(), "/k");
    assert_eq!(conflicts[0].kind(), ConflictKind::Access);
    assert_eq!(conflicts[0].self_tx(), Some(1));
    assert_eq!(conflicts[0].tx_ids(), &[2]);
}

#[test]
fn scenario_a_loser_leaves_no_trace() {
    let store = rooted_store();
    let mut batch = execute(&store, 1, |c| c.write(1, "/k", Some(Value::Int64(1))).unwrap());
    batch.extend(execute(&store, 2, |c| c.write(2, "/k", Some(Value::Int64(2))).unwrap()));

    let outcome = engine(store.clone()).process(batch).unwrap();
    assert_eq!(outcome.aborted, vec![2]);
    assert_eq!(store.retrieve("/k").unwrap(), Some(Value::Int64(1)));
    // only the winner's child addition reached the root listing
    assert_eq!(
        store.retrieve("/").unwrap().and_then(|v| v.keys()),
        Some(vec!["k".to_string()])
    );
}

// ============================================================================
// Scenario B: overflow on a [0, 25] counter
// ============================================================================

#[test]
fn scenario_b_overflow_names_pushing_tx() {
    let batch = vec![
        delta_record(1, "/c", 10, true, 0, 25),
        delta_record(2, "/c", 20, true, 0, 25),
        delta_record(3, "/c", 5, false, 0, 25),
    ];
    let conflicts = Arbitrator::detect(&batch);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].kind(), ConflictKind::OverflowLimit);
    assert_eq!(conflicts[0].tx_ids(), &[2]);
}

#[test]
fn scenario_b_through_write_caches() {
    let store = counter_store("/c", 0, 0, 25);
    let mut batch = Vec::new();
    for (tx, magnitude, positive) in [(1, 10, true), (2, 20, true), (3, 5, false)] {
        batch.extend(execute(&store, tx, |c| {
            c.write(tx, "/c", Some(Value::u64_delta(magnitude, positive, 0, 25)))
                .unwrap()
        }));
    }

    let outcome = engine(store.clone()).process(batch).unwrap();
    assert_eq!(outcome.aborted, vec![2]);
    assert_eq!(outcome.conflicts.len(), 1);
    assert!(outcome.rejected.is_empty());
    assert_eq!(store.retrieve("/c").unwrap().and_then(|v| v.as_u64()), Some(5));
}

#[test]
fn scenario_b_without_stored_value() {
    let store = rooted_store();
    let mut batch = Vec::new();
    for (tx, magnitude, positive) in [(1, 10, true), (2, 20, true), (3, 5, false)] {
        batch.extend(execute(&store, tx, |c| {
            c.write(tx, "/c", Some(Value::u64_delta(magnitude, positive, 0, 25)))
                .unwrap()
        }));
    }
    batch.extend(execute(&store, 4, |c| {
        c.write(4, "/other", Some(Value::Int64(4))).unwrap()
    }));

    let outcome = engine(store.clone()).process(batch).unwrap();
    assert_eq!(outcome.aborted, vec![2]);
    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].kind(), ConflictKind::OverflowLimit);
    assert!(outcome.rejected.is_empty());
    assert_eq!(outcome.committed, vec!["/", "/c", "/other"]);

    assert_eq!(store.retrieve("/c").unwrap(), Some(Value::u64(5, 0, 25)));
    assert_eq!(store.retrieve("/other").unwrap(), Some(Value::Int64(4)));
    assert_eq!(
        store.retrieve("/").unwrap().and_then(|v| v.keys()),
        Some(vec!["c".to_string(), "other".to_string()])
    );
}

// ============================================================================
// Scenario C: directory round trip
// ============================================================================

fn build_docs(store: &std::sync::Arc<MemoryStore>) -> Vec<Univalue> {
    execute(store, 1, |c| {
        c.write(1, "/docs/", Some(Value::dir())).unwrap();
        c.write(1, "/docs/a", Some(Value::String("alpha".into()))).unwrap();
        c.write(1, "/docs/b", Some(Value::String("beta".into()))).unwrap();
    })
}

#[test]
fn scenario_c_reimport_reproduces_listing() {
    let store = rooted_store();
    let records = build_docs(&store);

    let mut fresh = WriteCache::new(rooted_store());
    fresh.insert(records);
    assert_eq!(
        fresh.list(2, "/docs/").unwrap(),
        Some(vec!["a".to_string(), "b".to_string()])
    );
    assert_eq!(fresh.read(2, "/docs/b").unwrap(), Some(Value::String("beta".into())));
}

#[test]
fn scenario_c_survives_transition_log() {
    let store = rooted_store();
    let records = build_docs(&store);
    let bytes = transition_log::encode(&records).unwrap();
    let decoded = transition_log::decode(&bytes).unwrap();
    assert_eq!(decoded, records);

    let outcome = engine(store.clone()).process_log(&bytes).unwrap();
    assert_eq!(outcome.committed, vec!["/", "/docs/", "/docs/a", "/docs/b"]);
    assert_eq!(
        store.retrieve("/docs/").unwrap().and_then(|v| v.keys()),
        Some(vec!["a".to_string(), "b".to_string()])
    );
    assert_eq!(
        store.retrieve("/").unwrap().and_then(|v| v.keys()),
        Some(vec!["docs/".to_string()])
    );
}
