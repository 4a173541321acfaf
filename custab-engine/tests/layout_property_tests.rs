//! Property-based tests for merged reads and override writes.

use custab_engine::LayoutEngine;
use custab_test_utils::assertions::*;
use custab_test_utils::generators::*;
use custab_test_utils::*;
use proptest::prelude::*;
use std::collections::HashSet;
use std::future::Future;

const MODULE: &str = "M1";

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

/// Values, a column baseline over them, and a user override batch over a
/// subset of them.
fn arb_column_layout() -> impl Strategy<
    Value = (
        Vec<String>,
        Vec<BaselineSubmission<Column>>,
        Vec<OverrideSubmission<Column>>,
    ),
> {
    arb_distinct_values(1, 8).prop_flat_map(|values| {
        (
            Just(values.clone()),
            arb_column_baseline(values.clone()),
            arb_column_override_batch(values),
        )
    })
}

fn seeded_engine(
    baseline: Vec<BaselineSubmission<Column>>,
) -> LayoutEngine<MemoryLayoutStore> {
    let engine = LayoutEngine::new(MemoryLayoutStore::new(), LayoutConfig::default());
    block_on(engine.apply_baseline_batch(MODULE, baseline)).unwrap();
    engine
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every field of an effective item comes from the override when set,
    /// otherwise from the baseline.
    #[test]
    fn prop_merge_coalesces_each_field(
        (_values, baseline, batch) in arb_column_layout(),
        user in arb_user_id(),
    ) {
        let engine = seeded_engine(baseline);
        block_on(engine.apply_override_batch(MODULE, &user, batch.clone())).unwrap();

        let stored = block_on(engine.read_baseline::<Column>(MODULE)).unwrap();
        let effective = block_on(engine.read_effective::<Column>(MODULE, &user)).unwrap();
        prop_assert_eq!(effective.len(), stored.len());

        for item in &effective {
            let base = stored.iter().find(|b| b.value == item.value).unwrap();
            let submitted = batch.iter().position(|r| r.value == item.value);
            match submitted {
                Some(position) => {
                    let row = &batch[position];
                    prop_assert_eq!(item.hidden, row.hidden.unwrap_or(false));
                    prop_assert_eq!(item.seq, position as i32);
                    prop_assert_eq!(
                        &item.resolved,
                        &Column::resolve(&base.attrs, Some(&row.overrides))
                    );
                }
                None => {
                    prop_assert!(!item.hidden);
                    prop_assert_eq!(item.seq, base.seq);
                    prop_assert_eq!(item.id, base.id);
                    prop_assert_eq!(&item.resolved, &Column::resolve(&base.attrs, None));
                }
            }
            prop_assert_eq!(&item.name, &base.name);
            prop_assert_eq!(item.fixed, base.fixed);
        }

        assert_sorted_by_seq(&effective);
    }

    /// Overrides for values outside the baseline never surface.
    #[test]
    fn prop_orphans_are_excluded(
        values in arb_distinct_values(1, 6),
        orphans in arb_distinct_values(1, 4),
    ) {
        let orphans: Vec<String> = orphans.into_iter().map(|o| format!("9{}", o)).collect();
        let baseline = values.iter().map(|v| BaselineSubmission::<Filter>::create(v.clone(), v.clone())).collect();
        let engine = LayoutEngine::new(MemoryLayoutStore::new(), LayoutConfig::default());
        block_on(engine.apply_baseline_batch(MODULE, baseline)).unwrap();

        let batch = orphans
            .iter()
            .chain(values.iter())
            .map(|v| OverrideSubmission::<Filter>::update(v.clone()).with_hidden(true))
            .collect();
        block_on(engine.apply_override_batch(MODULE, "U1", batch)).unwrap();

        let effective = block_on(engine.read_effective::<Filter>(MODULE, "U1")).unwrap();
        prop_assert_eq!(effective.len(), values.len());
        prop_assert!(effective.iter().all(|item| !orphans.contains(&item.value)));
    }

    /// Resetting a user's overrides returns their view to the baseline and
    /// leaves other users alone.
    #[test]
    fn prop_reset_restores_baseline(
        (_values, baseline, batch) in arb_column_layout(),
    ) {
        let engine = seeded_engine(baseline);
        block_on(engine.apply_override_batch(MODULE, "U1", batch.clone())).unwrap();
        block_on(engine.apply_override_batch(MODULE, "U2", batch.clone())).unwrap();

        let removed = block_on(engine.reset_overrides::<Column>(MODULE, "U1")).unwrap();
        prop_assert_eq!(removed, batch.len() as u64);

        let stored = block_on(engine.read_baseline::<Column>(MODULE)).unwrap();
        let effective = block_on(engine.read_effective::<Column>(MODULE, "U1")).unwrap();
        assert_baseline_only(&effective, &stored);

        let remaining = block_on(engine.list_overrides::<Column>(MODULE)).unwrap();
        prop_assert_eq!(remaining.len(), batch.len());
        prop_assert!(remaining.iter().all(|o| o.user_id == "U2"));
    }

    /// Submitting the same batch twice leaves one row per value.
    #[test]
    fn prop_override_batch_is_idempotent(
        values in arb_distinct_values(1, 8),
        user in arb_user_id(),
        module in arb_module_id(),
    ) {
        let engine = LayoutEngine::new(MemoryLayoutStore::new(), LayoutConfig::default());
        let batch: Vec<_> = values
            .iter()
            .map(|v| OverrideSubmission::<Filter>::update(v.clone()))
            .collect();

        let first = block_on(engine.apply_override_batch(&module, &user, batch.clone())).unwrap();
        let second = block_on(engine.apply_override_batch(&module, &user, batch)).unwrap();
        prop_assert_eq!(first.inserted, values.len());
        prop_assert_eq!(second.inserted, 0);
        prop_assert_eq!(second.updated, values.len());

        let stored = block_on(engine.list_overrides::<Filter>(&module)).unwrap();
        let distinct: HashSet<_> = stored.iter().map(|o| o.value.as_str()).collect();
        prop_assert_eq!(stored.len(), values.len());
        prop_assert_eq!(distinct.len(), values.len());
    }

    /// Only whitelisted fields are nulled; everything else is untouched.
    #[test]
    fn prop_nullify_respects_whitelist(
        (values, request) in arb_distinct_values(1, 6)
            .prop_flat_map(|values| (Just(values.clone()), arb_column_nullify_request(values))),
        width in arb_width(),
    ) {
        let baseline = values.iter().map(|v| BaselineSubmission::<Column>::create(v.clone(), v.clone())).collect();
        let engine = seeded_engine(baseline);
        let batch = values
            .iter()
            .map(|v| {
                OverrideSubmission::<Column>::update(v.clone())
                    .with_hidden(true)
                    .with_overrides(ColumnOverrides {
                        frozen: Some(true),
                        location: Some("c".to_string()),
                        rule: Some("sum".to_string()),
                        width: Some(width),
                    })
            })
            .collect();
        block_on(engine.apply_override_batch(MODULE, "U1", batch)).unwrap();

        block_on(engine.nullify_fields::<Column>(MODULE, &request)).unwrap();

        let stored = block_on(engine.list_overrides::<Column>(MODULE)).unwrap();
        for row in &stored {
            let asked = request.get(&row.value).cloned().unwrap_or_default();
            let cleared = |name: &str| asked.iter().any(|f| f == name);
            prop_assert_eq!(row.hidden.is_none(), cleared("hidden"));
            prop_assert_eq!(row.overrides.frozen.is_none(), cleared("frozen"));
            prop_assert_eq!(row.overrides.location.is_none(), cleared("location"));
            prop_assert_eq!(row.overrides.width.is_none(), cleared("width"));
            prop_assert_eq!(row.overrides.rule.as_deref(), Some("sum"));
            prop_assert!(row.seq.is_some());
        }
    }

    /// A baseline batch whose update targets an unknown id leaves the
    /// baseline exactly as it was.
    #[test]
    fn prop_baseline_batch_is_atomic(
        (_values, baseline, _batch) in arb_column_layout(),
        stray in arb_uuid_v7(),
    ) {
        let engine = seeded_engine(baseline);
        let before = block_on(engine.read_baseline::<Column>(MODULE)).unwrap();

        let mut rows: Vec<_> = before
            .iter()
            .map(|b| BaselineSubmission::<Column>::update(b.id, b.value.clone(), "renamed"))
            .collect();
        rows.push(BaselineSubmission::<Column>::update(stray, "9stray", "stray"));
        rows.push(BaselineSubmission::<Column>::create("9added", "added"));

        let result = block_on(engine.apply_baseline_batch(MODULE, rows));
        assert_not_found(&result, KindTag::Column);

        let after = block_on(engine.read_baseline::<Column>(MODULE)).unwrap();
        prop_assert_eq!(after, before);
    }

    /// Filter visibility follows the override flag when set.
    #[test]
    fn prop_filter_hidden_follows_override(
        (values, batch) in arb_distinct_values(1, 8)
            .prop_flat_map(|values| (Just(values.clone()), arb_filter_override_batch(values))),
    ) {
        let engine = LayoutEngine::new(MemoryLayoutStore::new(), LayoutConfig::default());
        let baseline = values.iter().map(|v| BaselineSubmission::<Filter>::create(v.clone(), v.clone())).collect();
        block_on(engine.apply_baseline_batch(MODULE, baseline)).unwrap();
        block_on(engine.apply_override_batch(MODULE, "U1", batch.clone())).unwrap();

        let effective = block_on(engine.read_effective::<Filter>(MODULE, "U1")).unwrap();
        for item in &effective {
            let expected = batch
                .iter()
                .find(|r| r.value == item.value)
                .and_then(|r| r.hidden)
                .unwrap_or(false);
            prop_assert_eq!(item.hidden, expected);
        }
        assert_sorted_by_seq(&effective);
    }

    /// Status tags other than Update never write an override row.
    #[test]
    fn prop_only_update_rows_write(
        values in arb_distinct_values(1, 6),
        tags in prop::collection::vec(arb_status_tag(), 6),
    ) {
        let engine = LayoutEngine::new(MemoryLayoutStore::new(), LayoutConfig::default());
        let batch: Vec<_> = values
            .iter()
            .zip(tags.iter())
            .map(|(v, tag)| OverrideSubmission::<Filter>::new(*tag, v.clone()))
            .collect();
        let expected = batch.iter().filter(|r| r.status == StatusTag::Update).count();

        let outcome = block_on(engine.apply_override_batch(MODULE, "U1", batch)).unwrap();
        prop_assert_eq!(outcome.inserted, expected);

        let stored = block_on(engine.list_overrides::<Filter>(MODULE)).unwrap();
        prop_assert_eq!(stored.len(), expected);
    }
}
