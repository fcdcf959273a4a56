//! Directory maintenance through write caches

use std::sync::Arc;

use crate::common::*;
use parastate::Error;

#[test]
fn child_requires_existing_parent() {
    let store = rooted_store();
    let mut cache = WriteCache::new(store);
    let err = cache.write(1, "/a/b", Some(Value::Int64(1))).unwrap_err();
    assert!(matches!(err, Error::ParentNotFound(_)));
    cache.write(1, "/a/", Some(Value::dir())).unwrap();
    cache.write(1, "/a/b", Some(Value::Int64(1))).unwrap();
}

#[test]
fn system_may_write_roots() {
    let store: Arc<dyn ReadOnlyStore> = Arc::new(MemoryStore::new());
    let mut cache = WriteCache::new(store);
    cache.write(SYSTEM, "/", Some(Value::dir())).unwrap();
    cache.write(SYSTEM, "/blocks/", Some(Value::dir())).unwrap();
    assert_eq!(cache.list(SYSTEM, "/").unwrap(), Some(vec!["blocks/".to_string()]));
}

#[test]
fn system_paths_keep_listing_untouched() {
    let store = rooted_store();
    store.put("/blocks/", &Value::dir()).unwrap();
    let config = EngineConfig {
        system_paths: vec!["/blocks/".to_string()],
        ..EngineConfig::default()
    };
    let engine = BatchProcessor::new(store.clone(), config).unwrap();

    let mut cache = engine.write_cache();
    cache.write(1, "/blocks/1", Some(Value::Bytes(vec![1]))).unwrap();
    let outcome = engine.process(cache.export(&[&InterTransaction])).unwrap();

    assert_eq!(outcome.committed, vec!["/blocks/1"]);
    assert_eq!(store.retrieve("/blocks/").unwrap().and_then(|v| v.keys()), Some(vec![]));
}

#[test]
fn concurrent_children_commute() {
    let store = rooted_store();
    store.put("/users/", &Value::dir()).unwrap();
    let mut batch = Vec::new();
    for (tx, name) in [(1, "ann"), (2, "bo"), (3, "cy")] {
        let path = format!("/users/{}", name);
        batch.extend(execute(&store, tx, |c| c.write(tx, &path, Some(Value::Int64(0))).unwrap()));
    }
    let outcome = engine(store.clone()).process(batch).unwrap();
    assert!(outcome.is_clean());
    assert_eq!(
        store.retrieve("/users/").unwrap().and_then(|v| v.keys()),
        Some(vec!["ann".to_string(), "bo".to_string(), "cy".to_string()])
    );
}

#[test]
fn deletion_removes_child_from_listing() {
    let store = rooted_store();
    store.put("/users/", &Value::Path(PathDir::with_children(["ann", "bo"]))).unwrap();
    store.put("/users/ann", &Value::Int64(1)).unwrap();

    let batch = execute(&store, 1, |c| c.write(1, "/users/ann", None).unwrap());
    engine(store.clone()).process(batch).unwrap();

    assert!(!store.exists("/users/ann"));
    assert_eq!(
        store.retrieve("/users/").unwrap().and_then(|v| v.keys()),
        Some(vec!["bo".to_string()])
    );
}

#[test]
fn cascading_cache_sees_lower_writes() {
    let store = rooted_store();
    let backing: Arc<dyn ReadOnlyStore> = store;
    let mut lower = WriteCache::new(backing);
    lower.write(1, "/tmp/", Some(Value::dir())).unwrap();

    let mut upper = WriteCache::new(Arc::new(lower));
    upper.write(2, "/tmp/x", Some(Value::Int64(5))).unwrap();
    assert_eq!(upper.list(2, "/tmp/").unwrap(), Some(vec!["x".to_string()]));
    let exported = upper.export(&[&InterProcess]);
    let paths: Vec<&str> = exported.iter().map(Univalue::path).collect();
    assert_eq!(paths, vec!["/tmp/", "/tmp/x"]);
}
