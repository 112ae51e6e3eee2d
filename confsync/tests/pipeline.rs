//! End-to-end reconciliation against the in-memory store.
//!
//! These tests drive the load -> flatten -> diff -> apply pipeline and
//! verify:
//! - Idempotence: a second run over unchanged input mutates nothing
//! - Orphan deletion stays inside the loaded scopes
//! - Dry-run tallies every change without touching the store
//! - Account-scoped documents land on the shared key space

use confsync::{
    ConfigGroup, ConfigLoader, ReconcileEngine, ReconcileReport, SyncError, SyncOptions,
    split_at_depth
};
use std::path::Path;
use std::sync::Arc;
use testing::{InMemoryStore, config_tree};

fn load(dir: &Path, root: &str, account: Option<&str>) -> Vec<ConfigGroup> {
    ConfigLoader::new(dir, root, account.map(String::from))
        .expect("valid store root")
        .load()
        .expect("config tree loads")
}

#[tokio::test]
async fn test_first_run_writes_second_run_is_clean() {
    let dir = config_tree(&[
        ("app.yaml", "db:\n  host: localhost\n  port: 5432\n"),
        ("services/web.yaml", "replicas: 2\n")
    ]);
    let store = Arc::new(InMemoryStore::new());
    let engine = ReconcileEngine::new(store.clone(), SyncOptions::default());
    let groups = load(dir.path(), "/base", None);

    let report = engine.reconcile(&groups).await.unwrap();
    assert_eq!(report.updated, 3);
    assert_eq!(report.deleted, 0);
    assert_eq!(report.untouched, 0);
    assert!(report.completed_at.is_some());

    let snapshot = store.snapshot();
    assert_eq!(snapshot.get("/base/app/db/host"), Some(&"localhost".to_string()));
    assert_eq!(snapshot.get("/base/app/db/port"), Some(&"5432".to_string()));
    assert_eq!(
        snapshot.get("/base/services/web/replicas"),
        Some(&"2".to_string())
    );

    let second = engine.reconcile(&groups).await.unwrap();
    assert_eq!(second.updated, 0);
    assert_eq!(second.deleted, 0);
    assert_eq!(second.untouched, 3);
}

#[tokio::test]
async fn test_orphans_deleted_within_loaded_scopes_only() {
    let store = Arc::new(InMemoryStore::with_parameters(&[
        ("/base/app/stale", "old"),
        ("/base/app/db/host", "localhost"),
        ("/unrelated/keep", "x")
    ]));
    let dir = config_tree(&[("app.yaml", "db:\n  host: localhost\n")]);
    let engine = ReconcileEngine::new(store.clone(), SyncOptions::default());

    let report = engine.reconcile(&load(dir.path(), "/base", None)).await.unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.untouched, 1);

    let snapshot = store.snapshot();
    assert!(!snapshot.contains_key("/base/app/stale"));
    assert!(snapshot.contains_key("/unrelated/keep"));
}

#[tokio::test]
async fn test_only_changed_values_are_written() {
    let store = Arc::new(InMemoryStore::with_parameters(&[
        ("/base/app/db/host", "old-host"),
        ("/base/app/db/port", "5432")
    ]));
    let dir = config_tree(&[("app.yaml", "db:\n  host: new-host\n  port: 5432\n")]);
    let engine = ReconcileEngine::new(store.clone(), SyncOptions::default());

    let report = engine.reconcile(&load(dir.path(), "/base", None)).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.untouched, 1);
    assert_eq!(store.counters().puts, 1);
    assert_eq!(
        store.snapshot().get("/base/app/db/host"),
        Some(&"new-host".to_string())
    );
}

#[tokio::test]
async fn test_orphan_deletes_run_in_bounded_batches() {
    let store = Arc::new(InMemoryStore::new());
    for i in 0..11 {
        store.seed(&format!("/base/app/stale/{i}"), "x");
    }
    let dir = config_tree(&[("app.yaml", "keep: value\n")]);
    let engine = ReconcileEngine::new(store.clone(), SyncOptions::default());

    let report = engine.reconcile(&load(dir.path(), "/base", None)).await.unwrap();
    assert_eq!(report.deleted, 11);
    // 11 orphans at the default batch size of 8 means two calls.
    assert_eq!(store.counters().bulk_deletes, 2);
    assert_eq!(store.snapshot().len(), 1);
}

#[tokio::test]
async fn test_unresolved_deletes_reported_not_fatal() {
    let store = Arc::new(InMemoryStore::with_parameters(&[("/base/app/stale", "x")]));
    store.mark_unresolved("/base/app/stale");
    let dir = config_tree(&[("app.yaml", "keep: value\n")]);
    let engine = ReconcileEngine::new(store.clone(), SyncOptions::default());

    let report = engine.reconcile(&load(dir.path(), "/base", None)).await.unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(report.unresolved, vec!["/base/app/stale"]);
    assert!(!report.is_clean());
}

#[tokio::test]
async fn test_write_failure_aborts_the_run() {
    let store = Arc::new(InMemoryStore::new());
    store.fail_put_on("/base/app/alpha");
    let dir = config_tree(&[("app.yaml", "alpha: 1\nbeta: 2\n")]);
    let engine = ReconcileEngine::new(store.clone(), SyncOptions::default());

    let err = engine
        .reconcile(&load(dir.path(), "/base", None))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::StoreWrite { .. }));
    assert_eq!(store.counters().puts, 1);
    assert!(!store.snapshot().contains_key("/base/app/beta"));
}

#[tokio::test]
async fn test_dry_run_tallies_without_writing() {
    let store = Arc::new(InMemoryStore::with_parameters(&[
        ("/base/app/stale", "x"),
        ("/base/app/keep", "same")
    ]));
    let dir = config_tree(&[("app.yaml", "keep: same\nfresh: new\n")]);
    let options = SyncOptions {
        dry_run: true,
        ..Default::default()
    };
    let engine = ReconcileEngine::new(store.clone(), options);

    let report = engine.reconcile(&load(dir.path(), "/base", None)).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.untouched, 1);
    assert_eq!(report.deleted, 1);

    let counters = store.counters();
    assert_eq!(counters.puts, 0);
    assert_eq!(counters.bulk_deletes, 0);
    assert!(store.snapshot().contains_key("/base/app/stale"));
    assert!(!store.snapshot().contains_key("/base/app/fresh"));
}

#[tokio::test]
async fn test_account_override_documents_land_on_shared_keys() {
    let dir = config_tree(&[
        ("account.yaml", "db:\n  port: 5432\n"),
        ("account/111122223333.yaml", "db:\n  port: 5433\n"),
        ("account/222233334444.yaml", "db:\n  port: 9999\n")
    ]);
    let store = Arc::new(InMemoryStore::new());
    let options = SyncOptions {
        account: Some("111122223333".to_string()),
        ..Default::default()
    };
    let engine = ReconcileEngine::new(store.clone(), options);
    let groups = load(dir.path(), "/base", Some("111122223333"));

    let report = engine.reconcile(&groups).await.unwrap();
    // The base document and the account override collapse onto one key;
    // the override wins.
    assert_eq!(report.updated, 1);
    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(
        snapshot.get("/base/account/db/port"),
        Some(&"5433".to_string())
    );
    // Both group roots normalize to the same scope, queried once.
    assert_eq!(store.counters().lists, 1);

    let second = engine.reconcile(&groups).await.unwrap();
    assert_eq!(second.updated, 0);
    assert_eq!(second.untouched, 1);
}

#[tokio::test]
async fn test_split_buckets_merge_to_whole_run_totals() {
    let dir = config_tree(&[
        ("app.yaml", "name: demo\n"),
        ("services/jobs.yaml", "schedule: nightly\n"),
        ("services/web.yaml", "replicas: 2\n")
    ]);
    let store = Arc::new(InMemoryStore::new());
    let engine = ReconcileEngine::new(store.clone(), SyncOptions::default());
    let groups = load(dir.path(), "/base", None);

    let buckets = split_at_depth(&groups, 1);
    assert_eq!(buckets.len(), 2);

    let mut merged = ReconcileReport::new();
    for bucket in &buckets {
        merged.merge(engine.reconcile(&bucket.groups).await.unwrap());
    }
    merged.complete();

    assert_eq!(merged.updated, 3);
    assert_eq!(merged.deleted, 0);
    assert_eq!(store.snapshot().len(), 3);

    let second = engine.reconcile(&groups).await.unwrap();
    assert_eq!(second.untouched, 3);
}

#[tokio::test]
async fn test_destroy_removes_defined_keys() {
    let store = Arc::new(InMemoryStore::with_parameters(&[
        ("/base/app/db/host", "x"),
        ("/base/app/db/port", "y"),
        ("/unrelated/keep", "z")
    ]));
    let dir = config_tree(&[("app.yaml", "db:\n  host: x\n  port: y\n  extra: q\n")]);
    let engine = ReconcileEngine::new(store.clone(), SyncOptions::default());

    let removed = engine.destroy(&load(dir.path(), "/base", None)).await.unwrap();
    // `extra` was never written; destroying it is a no-op, not an error.
    assert_eq!(removed, 2);
    assert_eq!(store.counters().single_deletes, 3);

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.contains_key("/unrelated/keep"));
}

#[tokio::test]
async fn test_destroy_dry_run_deletes_nothing() {
    let store = Arc::new(InMemoryStore::with_parameters(&[("/base/app/db/host", "x")]));
    let dir = config_tree(&[("app.yaml", "db:\n  host: x\n")]);
    let options = SyncOptions {
        dry_run: true,
        ..Default::default()
    };
    let engine = ReconcileEngine::new(store.clone(), options);

    let removed = engine.destroy(&load(dir.path(), "/base", None)).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(store.counters().single_deletes, 0);
    assert!(store.snapshot().contains_key("/base/app/db/host"));
}
