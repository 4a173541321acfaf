//! Layer merge.
//!
//! Produces the effective view of a module for one user: one item per
//! baseline row, each overridable field coalesced override-first, ordered by
//! effective seq with storage order breaking ties.

use crate::entities::{BaselineItem, EffectiveItem, OverrideItem};
use crate::kind::ItemKind;
use std::collections::HashMap;

/// Coalesce a baseline row with its (optional) override row.
pub fn resolve_item<K: ItemKind>(
    base: BaselineItem<K>,
    over: Option<&OverrideItem<K>>,
) -> EffectiveItem<K> {
    EffectiveItem {
        id: over.map(|o| o.id).unwrap_or(base.id),
        hidden: over.and_then(|o| o.hidden).unwrap_or(false),
        seq: over.and_then(|o| o.seq).unwrap_or(base.seq),
        resolved: K::resolve(&base.attrs, over.map(|o| &o.overrides)),
        value: base.value,
        name: base.name,
        fixed: base.fixed,
    }
}

/// Merge a module's baseline rows (in storage order) with one user's
/// override rows.
///
/// Overrides are joined on `(module_id, value)`; overrides without a
/// baseline row are dropped. The sort is stable, so equal effective seqs
/// keep baseline storage order.
pub fn merge_layers<K: ItemKind>(
    baseline: Vec<BaselineItem<K>>,
    overrides: Vec<OverrideItem<K>>,
) -> Vec<EffectiveItem<K>> {
    let mut by_key: HashMap<(String, String), OverrideItem<K>> =
        HashMap::with_capacity(overrides.len());
    for over in overrides {
        by_key
            .entry((over.module_id.clone(), over.value.clone()))
            .or_insert(over);
    }

    let mut merged: Vec<EffectiveItem<K>> = baseline
        .into_iter()
        .map(|base| {
            let key = (base.module_id.clone(), base.value.clone());
            let over = by_key.get(&key);
            resolve_item(base, over)
        })
        .collect();

    merged.sort_by_key(|item| item.seq);
    merged
}

/// Order baseline rows by seq, keeping storage order for ties.
pub fn order_baseline<K: ItemKind>(mut baseline: Vec<BaselineItem<K>>) -> Vec<BaselineItem<K>> {
    baseline.sort_by_key(|item| item.seq);
    baseline
}


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
