//! Whitelist filtering
//!
//! Records of transactions outside the allow-set never reach finalization.

use crate::common::*;

fn disjoint_batch() -> Vec<Univalue> {
    vec![
        Univalue::new(1, "/one", 0, 1, 0, Some(Value::Int64(1)), false),
        Univalue::new(2, "/two", 0, 1, 0, Some(Value::Int64(2)), false),
        Univalue::new(3, "/three", 0, 1, 0, Some(Value::Int64(3)), false),
    ]
}

#[test]
fn white_list_excludes_unlisted_tx() {
    let importer = Importer::new(rooted_store());
    importer.import(disjoint_batch()).unwrap();
    importer.white_list(&[1, 3]);
    importer.sort();
    let out = importer.finalize().unwrap();

    assert!(out.records.iter().all(|r| r.tx() != 2));
    let paths: Vec<&str> = out.records.iter().map(Univalue::path).collect();
    assert_eq!(paths, vec!["/one", "/three"]);
}

#[test]
fn white_list_spares_system() {
    let importer = Importer::new(rooted_store());
    let mut batch = disjoint_batch();
    batch.push(Univalue::new(SYSTEM, "/sys", 0, 1, 0, Some(Value::Int64(0)), false));
    importer.import(batch).unwrap();
    importer.white_list(&[]);
    importer.sort();
    let out = importer.finalize().unwrap();

    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].tx(), SYSTEM);
}

#[test]
fn white_list_voids_every_key_of_a_loser() {
    let store = rooted_store();
    let mut batch = execute(&store, 1, |c| {
        c.write(1, "/x", Some(Value::Int64(1))).unwrap();
        c.write(1, "/y", Some(Value::Int64(1))).unwrap();
    });
    batch.extend(execute(&store, 2, |c| c.write(2, "/x", Some(Value::Int64(2))).unwrap()));
    batch.extend(execute(&store, 3, |c| {
        c.read(3, "/x").unwrap();
        c.write(3, "/z", Some(Value::Int64(3))).unwrap();
    }));

    let outcome = engine(store.clone()).process(batch).unwrap();
    // tx 3 read /x while tx 1 wrote it
    assert_eq!(outcome.aborted, vec![2, 3]);
    assert!(store.exists("/y"));
    assert!(!store.exists("/z"));
    assert_eq!(
        store.retrieve("/").unwrap().and_then(|v| v.keys()),
        Some(vec!["x".to_string(), "y".to_string()])
    );
}
