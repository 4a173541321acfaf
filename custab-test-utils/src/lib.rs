//! CUSTAB Test Utilities
//!
//! Shared test infrastructure for the custab workspace:
//! - Proptest generators for layout items and submissions
//! - Fixtures that seed an in-memory store
//! - Assertions for layout results and errors

// Re-export the in-memory store from its source crate
pub use custab_storage::{LayoutStore, MemoryLayoutStore, StorableKind};

// Re-export core types for convenience
pub use custab_core::{
    BaselineItem, BaselineSubmission, BatchOutcome, Column, ColumnAttrs,
    ColumnOverrides, DeleteScope, EffectiveItem, Filter, ItemKind, KindTag, LayoutConfig,
    LayoutError, LayoutResult, NoExtras, OverrideItem, OverrideMatchScope, OverrideSubmission,
    RequiredKey, StatusTag, StorageError, ValidationError,
};

use uuid::Uuid;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for layout types.

    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    /// Generate a valid UUIDv7 (timestamp-sortable).
    pub fn arb_uuid_v7() -> impl Strategy<Value = Uuid> {
        Just(()).prop_map(|_| Uuid::now_v7())
    }

    /// Item value keys: short lowercase identifiers.
    pub fn arb_value() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,7}"
    }

    pub fn arb_module_id() -> impl Strategy<Value = String> {
        "M[0-9]{1,3}"
    }

    pub fn arb_user_id() -> impl Strategy<Value = String> {
        "U[0-9]{1,3}"
    }

    /// Between `min` and `max` distinct values, in generation order.
    pub fn arb_distinct_values(min: usize, max: usize) -> impl Strategy<Value = Vec<String>> {
        prop::collection::btree_set(arb_value(), min..=max)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    }

    pub fn arb_width() -> impl Strategy<Value = f64> {
        (1u32..2000).prop_map(f64::from)
    }

    pub fn arb_location() -> impl Strategy<Value = String> {
        prop_oneof![Just("l".to_string()), Just("c".to_string()), Just("r".to_string())]
    }

    pub fn arb_status_tag() -> impl Strategy<Value = StatusTag> {
        prop_oneof![
            Just(StatusTag::Unchanged),
            Just(StatusTag::Create),
            Just(StatusTag::Update),
            Just(StatusTag::Delete),
        ]
    }

    pub fn arb_column_attrs() -> impl Strategy<Value = ColumnAttrs> {
        (arb_location(), prop_oneof![Just(String::new()), "[a-z]{3,6}"])
            .prop_map(|(location, rule)| ColumnAttrs { location, rule })
    }

    /// Sparse column overrides; each field independently absent.
    pub fn arb_column_overrides() -> impl Strategy<Value = ColumnOverrides> {
        (
            prop::option::of(any::<bool>()),
            prop::option::of(arb_location()),
            prop::option::of("[a-z]{3,6}"),
            prop::option::of(arb_width()),
        )
            .prop_map(|(frozen, location, rule, width)| ColumnOverrides {
                frozen,
                location,
                rule,
                width,
            })
    }

    /// Create rows for a fresh column baseline over `values`.
    pub fn arb_column_baseline(values: Vec<String>) -> impl Strategy<Value = Vec<BaselineSubmission<Column>>> {
        let len = values.len();
        (
            prop::collection::vec(arb_column_attrs(), len),
            prop::collection::vec(any::<bool>(), len),
        )
            .prop_map(move |(attrs, fixed)| {
                values
                    .iter()
                    .zip(attrs)
                    .zip(fixed)
                    .map(|((value, attrs), fixed)| {
                        BaselineSubmission::create(value.clone(), value.to_uppercase())
                            .with_fixed(fixed)
                            .with_attrs(attrs)
                    })
                    .collect()
            })
    }

    /// Update rows for a subset of `values`.
    pub fn arb_column_override_batch(
        values: Vec<String>,
    ) -> impl Strategy<Value = Vec<OverrideSubmission<Column>>> {
        let len = values.len();
        prop::collection::vec(
            (any::<bool>(), prop::option::of(any::<bool>()), arb_column_overrides()),
            len,
        )
        .prop_map(move |choices| {
            values
                .iter()
                .zip(choices)
                .filter(|(_, (keep, _, _))| *keep)
                .map(|(value, (_, hidden, overrides))| {
                    let mut row = OverrideSubmission::update(value.clone()).with_overrides(overrides);
                    row.hidden = hidden;
                    row
                })
                .collect()
        })
    }

    /// Update rows for a subset of `values`, hidden flag optional.
    pub fn arb_filter_override_batch(
        values: Vec<String>,
    ) -> impl Strategy<Value = Vec<OverrideSubmission<Filter>>> {
        let len = values.len();
        prop::collection::vec((any::<bool>(), prop::option::of(any::<bool>())), len).prop_map(
            move |choices| {
                values
                    .iter()
                    .zip(choices)
                    .filter(|(_, (keep, _))| *keep)
                    .map(|(value, (_, hidden))| {
                        let mut row = OverrideSubmission::update(value.clone());
                        row.hidden = hidden;
                        row
                    })
                    .collect()
            },
        )
    }

    /// Nullify request mixing legal column fields with made-up names.
    pub fn arb_column_nullify_request(
        values: Vec<String>,
    ) -> impl Strategy<Value = BTreeMap<String, Vec<String>>> {
        let field = prop_oneof![
            Just("hidden".to_string()),
            Just("frozen".to_string()),
            Just("location".to_string()),
            Just("width".to_string()),
            Just("rule".to_string()),
            Just("seq".to_string()),
            "[a-z]{4,10}Field",
        ];
        let len = values.len();
        prop::collection::vec(prop::collection::vec(field, 0..4), len).prop_map(move |fields| {
            values.iter().cloned().zip(fields).collect()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built layouts for common scenarios.

    use super::*;
    use custab_core::plan_baseline_batch;

    pub const MODULE: &str = "M1";
    pub const USER: &str = "U1";
    pub const OTHER_USER: &str = "U2";

    /// Insert `values` as a fresh baseline of module `module_id`, in order.
    /// Returns the stored rows.
    pub async fn seed_baseline<K: StorableKind, S: LayoutStore>(
        store: &S,
        module_id: &str,
        values: &[&str],
    ) -> LayoutResult<Vec<BaselineItem<K>>> {
        let rows = values
            .iter()
            .map(|v| BaselineSubmission::<K>::create(*v, v.to_uppercase()))
            .collect();
        let plan = plan_baseline_batch(module_id, rows, DeleteScope::Module)?;
        store.apply_baseline_plan(&plan).await?;
        store.baseline_list::<K>(module_id).await
    }

    /// Module `M1` with the single column `{value: age, name: Age}`.
    pub async fn age_column_store() -> LayoutResult<MemoryLayoutStore> {
        let store = MemoryLayoutStore::new();
        let plan = plan_baseline_batch(
            MODULE,
            vec![BaselineSubmission::<Column>::create("age", "Age")],
            DeleteScope::Module,
        )?;
        store.apply_baseline_plan(&plan).await?;
        Ok(store)
    }

    /// Column baseline with a spread of locations and rules.
    pub fn sample_columns() -> Vec<BaselineSubmission<Column>> {
        vec![
            BaselineSubmission::create("id", "ID").with_fixed(true).with_attrs(ColumnAttrs {
                location: "c".to_string(),
                rule: String::new(),
            }),
            BaselineSubmission::create("name", "Name").with_attrs(ColumnAttrs {
                location: "l".to_string(),
                rule: String::new(),
            }),
            BaselineSubmission::create("price", "Price").with_attrs(ColumnAttrs {
                location: "r".to_string(),
                rule: "money".to_string(),
            }),
        ]
    }

    /// Serialize a JSON literal into a request body.
    pub fn json_body(value: serde_json::Value) -> Vec<u8> {
        value.to_string().into_bytes()
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for layout results.

    use super::*;

    /// Assert that a LayoutResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &LayoutResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert a validation failure.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &LayoutResult<T>) {
        match result {
            Err(LayoutError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert a missing-key failure for `key`.
    #[track_caller]
    pub fn assert_missing_key<T: std::fmt::Debug>(result: &LayoutResult<T>, key: RequiredKey) {
        match result {
            Err(LayoutError::Validation(ValidationError::MissingRequiredKey { key: k })) => {
                assert_eq!(*k, key, "Wrong key in MissingRequiredKey error");
            }
            other => panic!("Expected MissingRequiredKey({}), got: {:?}", key, other),
        }
    }

    /// Assert a storage failure.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &LayoutResult<T>) {
        match result {
            Err(LayoutError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    /// Assert a baseline NotFound for `kind`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &LayoutResult<T>, kind: KindTag) {
        match result {
            Err(LayoutError::Storage(StorageError::NotFound { kind: k, .. })) => {
                assert_eq!(*k, kind, "Wrong kind in NotFound error");
            }
            other => panic!("Expected NotFound error for {}, got: {:?}", kind, other),
        }
    }

    /// Assert a uniqueness violation.
    #[track_caller]
    pub fn assert_constraint_violation<T: std::fmt::Debug>(result: &LayoutResult<T>) {
        match result {
            Err(LayoutError::Storage(StorageError::ConstraintViolation { .. })) => {}
            other => panic!("Expected ConstraintViolation, got: {:?}", other),
        }
    }

    /// Assert ascending effective seq.
    #[track_caller]
    pub fn assert_sorted_by_seq<K: ItemKind>(items: &[EffectiveItem<K>]) {
        for pair in items.windows(2) {
            assert!(
                pair[0].seq <= pair[1].seq,
                "Items out of order: {} (seq {}) before {} (seq {})",
                pair[0].value,
                pair[0].seq,
                pair[1].value,
                pair[1].seq
            );
        }
    }

    /// Assert every effective item carries baseline values only: no hidden
    /// flag, baseline id and baseline seq.
    #[track_caller]
    pub fn assert_baseline_only<K: ItemKind>(
        effective: &[EffectiveItem<K>],
        baseline: &[BaselineItem<K>],
    ) {
        assert_eq!(effective.len(), baseline.len(), "Effective/baseline length mismatch");
        for item in effective {
            let base = baseline
                .iter()
                .find(|b| b.value == item.value)
                .unwrap_or_else(|| panic!("No baseline row for {}", item.value));
            assert!(!item.hidden, "{} is hidden", item.value);
            assert_eq!(item.id, base.id, "{} carries an override id", item.value);
            assert_eq!(item.seq, base.seq, "{} carries an override seq", item.value);
            assert_eq!(
                item.resolved,
                K::resolve(&base.attrs, None),
                "{} carries override fields",
                item.value
            );
        }
    }
}
