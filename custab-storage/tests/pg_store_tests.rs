#![cfg(feature = "db-tests")]
//! PostgreSQL Store Integration Tests
//!
//! Runs against the database named by the `CUSTAB_DB_*` variables. Every
//! test works in its own freshly generated module id so runs never collide.

use custab_core::{
    plan_baseline_batch, plan_nullify, BaselineOp, BaselineSubmission, Column, DeleteScope,
    Filter, LayoutError, OverrideMatchScope, OverrideSubmission, StorageError,
};
use custab_storage::{DbConfig, LayoutStore, PgLayoutStore};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

async fn test_store() -> PgLayoutStore {
    let store = PgLayoutStore::from_config(&DbConfig::from_env())
        .expect("Failed to create connection pool");
    store.migrate().await.expect("Failed to apply layout schema");
    store
}

fn unique_module() -> String {
    format!("test-module-{}", Uuid::now_v7())
}

// ============================================================================
// BASELINE
// ============================================================================

#[tokio::test]
async fn test_baseline_round_trip_keeps_storage_order() {
    let store = test_store().await;
    let module = unique_module();

    let plan = plan_baseline_batch(
        &module,
        vec![
            BaselineSubmission::<Column>::create("b", "B"),
            BaselineSubmission::create("a", "A"),
        ],
        DeleteScope::Module,
    )
    .unwrap();
    let outcome = store.apply_baseline_plan(&plan).await.unwrap();
    assert_eq!(outcome.inserted, 2);

    let rows = store.baseline_list::<Column>(&module).await.unwrap();
    let values: Vec<&str> = rows.iter().map(|r| r.value.as_str()).collect();
    assert_eq!(values, vec!["b", "a"]);
}

#[tokio::test]
async fn test_baseline_update_of_missing_id_rolls_back() {
    let store = test_store().await;
    let module = unique_module();

    let seed = plan_baseline_batch(
        &module,
        vec![BaselineSubmission::<Filter>::create("a", "A")],
        DeleteScope::Module,
    )
    .unwrap();
    store.apply_baseline_plan(&seed).await.unwrap();
    let id = match &seed.ops[0] {
        BaselineOp::Insert(item) => item.id,
        other => panic!("expected insert, got {:?}", other),
    };

    let plan = plan_baseline_batch(
        &module,
        vec![
            BaselineSubmission::<Filter>::update(id, "a", "Renamed"),
            BaselineSubmission::update(Uuid::now_v7(), "ghost", "Ghost"),
        ],
        DeleteScope::Module,
    )
    .unwrap();
    let err = store.apply_baseline_plan(&plan).await.unwrap_err();
    assert!(matches!(err, LayoutError::Storage(StorageError::NotFound { .. })));

    let rows = store.baseline_list::<Filter>(&module).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "A");
}

#[tokio::test]
async fn test_duplicate_value_is_constraint_violation() {
    let store = test_store().await;
    let module = unique_module();

    let plan = plan_baseline_batch(
        &module,
        vec![
            BaselineSubmission::<Filter>::create("a", "A"),
            BaselineSubmission::create("a", "Again"),
        ],
        DeleteScope::Module,
    )
    .unwrap();
    let err = store.apply_baseline_plan(&plan).await.unwrap_err();
    assert!(matches!(
        err,
        LayoutError::Storage(StorageError::ConstraintViolation { .. })
    ));
    assert!(store.baseline_list::<Filter>(&module).await.unwrap().is_empty());
}

// ============================================================================
// OVERRIDES
// ============================================================================

#[tokio::test]
async fn test_override_batch_twice_keeps_one_row() {
    let store = test_store().await;
    let module = unique_module();
    let rows = vec![OverrideSubmission::<Filter>::update("age").with_hidden(true)];

    let first = store
        .apply_override_batch(&module, "U1", &rows, OverrideMatchScope::Module)
        .await
        .unwrap();
    let second = store
        .apply_override_batch(&module, "U1", &rows, OverrideMatchScope::Module)
        .await
        .unwrap();

    assert_eq!(first.inserted, 1);
    assert_eq!(second.updated, 1);
    assert_eq!(store.override_list::<Filter>(&module).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_width_then_nullify_then_reset() {
    let store = test_store().await;
    let module = unique_module();

    for user in ["U1", "U2"] {
        store.set_column_width(&module, user, "v1", 120.0).await.unwrap();
    }
    let again = store.set_column_width(&module, "U1", "v1", 150.0).await.unwrap();
    assert_eq!(again.updated, 1);

    let mut request = BTreeMap::new();
    request.insert("v1".to_string(), vec!["width".to_string(), "madeUpField".to_string()]);
    let touched = store
        .nullify_fields(&module, &plan_nullify::<Column>(&request))
        .await
        .unwrap();
    assert_eq!(touched, 2);
    for row in store.override_list::<Column>(&module).await.unwrap() {
        assert_eq!(row.overrides.width, None);
    }

    assert_eq!(store.reset_overrides::<Column>(&module, "U1").await.unwrap(), 1);
    assert_eq!(store.reset_overrides::<Column>(&module, "U1").await.unwrap(), 0);

    let snapshot = store.snapshot::<Column>(&module, "U2").await.unwrap();
    assert!(snapshot.baseline.is_empty());
    assert_eq!(snapshot.overrides.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_width_writes_leave_one_row() {
    let store = test_store().await;
    let module = unique_module();

    let (left, right) = tokio::join!(
        store.set_column_width(&module, "U1", "v1", 120.0),
        store.set_column_width(&module, "U1", "v1", 150.0),
    );
    let left = left.unwrap();
    let right = right.unwrap();
    assert_eq!(left.inserted + right.inserted, 1);
    assert_eq!(left.updated + right.updated, 1);

    let rows = store.override_list::<Column>(&module).await.unwrap();
    assert_eq!(rows.len(), 1);
    let width = rows[0].overrides.width;
    assert!(width == Some(120.0) || width == Some(150.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_override_batches_leave_one_row() {
    let store = test_store().await;
    let module = unique_module();
    let hide = vec![OverrideSubmission::<Filter>::update("age").with_hidden(true)];
    let show = vec![OverrideSubmission::<Filter>::update("age").with_hidden(false)];

    let (left, right) = tokio::join!(
        store.apply_override_batch(&module, "U1", &hide, OverrideMatchScope::Module),
        store.apply_override_batch(&module, "U1", &show, OverrideMatchScope::Module),
    );
    let left = left.unwrap();
    let right = right.unwrap();
    assert_eq!(left.written() + right.written(), 2);
    assert_eq!(left.inserted + right.inserted, 1);

    assert_eq!(store.override_list::<Filter>(&module).await.unwrap().len(), 1);
}
