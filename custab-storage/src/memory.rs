//! In-memory layout store.
//!
//! Writes clone the affected kind's tables, apply every statement to the
//! copy and swap it in only when all of them succeed, so a failed batch
//! leaves nothing behind. Reads hold one read guard for the whole snapshot.

use crate::{LayerSnapshot, LayoutStore, StorableKind};
use async_trait::async_trait;
use custab_core::{
    new_item_id, route_override_batch, BaselineItem, BaselineOp, BaselinePlan, BatchOutcome,
    Column, DeleteScope, Filter, ItemKind, LayoutResult, NullifyPlan, OverrideItem,
    OverrideMatchScope, OverrideOp, OverrideSubmission, StorageError,
};
use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// TABLES
// ============================================================================

/// Baseline and override rows of one kind. Baseline rows are kept in
/// insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct KindTables<K: ItemKind> {
    pub baseline: Vec<BaselineItem<K>>,
    pub overrides: Vec<OverrideItem<K>>,
}

impl<K: ItemKind> Default for KindTables<K> {
    fn default() -> Self {
        Self {
            baseline: Vec::new(),
            overrides: Vec::new(),
        }
    }
}

/// The four tables of the layout model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutTables {
    pub columns: KindTables<Column>,
    pub filters: KindTables<Filter>,
}

impl<K: ItemKind> KindTables<K> {
    fn insert_baseline(&mut self, item: BaselineItem<K>) -> Result<(), StorageError> {
        if self
            .baseline
            .iter()
            .any(|b| b.module_id == item.module_id && b.value == item.value)
        {
            return Err(baseline_conflict::<K>(&item));
        }
        self.baseline.push(item);
        Ok(())
    }

    fn update_baseline(&mut self, item: BaselineItem<K>) -> Result<(), StorageError> {
        if self
            .baseline
            .iter()
            .any(|b| b.module_id == item.module_id && b.value == item.value && b.id != item.id)
        {
            return Err(baseline_conflict::<K>(&item));
        }
        let row = self
            .baseline
            .iter_mut()
            .find(|b| b.module_id == item.module_id && b.id == item.id)
            .ok_or_else(|| StorageError::NotFound {
                kind: K::TAG,
                module_id: item.module_id.clone(),
                id: item.id,
            })?;
        *row = item;
        Ok(())
    }

    fn delete_baseline(&mut self, module_id: &str, value: &str, scope: DeleteScope) -> u64 {
        let before = self.baseline.len();
        self.baseline.retain(|b| match scope {
            DeleteScope::Module => !(b.module_id == module_id && b.value == value),
            DeleteScope::Global => b.value != value,
        });
        (before - self.baseline.len()) as u64
    }

    fn override_values(&self, module_id: &str, user_id: &str, scope: OverrideMatchScope) -> HashSet<String> {
        self.overrides
            .iter()
            .filter(|o| o.user_id == user_id)
            .filter(|o| scope == OverrideMatchScope::UserWide || o.module_id == module_id)
            .map(|o| o.value.clone())
            .collect()
    }

    fn find_override_mut(
        &mut self,
        module_id: &str,
        user_id: &str,
        value: &str,
    ) -> Option<&mut OverrideItem<K>> {
        self.overrides
            .iter_mut()
            .find(|o| o.module_id == module_id && o.user_id == user_id && o.value == value)
    }
}

fn baseline_conflict<K: ItemKind>(item: &BaselineItem<K>) -> StorageError {
    StorageError::ConstraintViolation {
        constraint: format!("{}_module_value_key", K::TAG),
        reason: format!(
            "value {:?} already exists in module {}",
            item.value, item.module_id
        ),
    }
}

// ============================================================================
// STORE
// ============================================================================

/// In-memory store for tests and embedded use.
#[derive(Debug, Clone, Default)]
pub struct MemoryLayoutStore {
    tables: Arc<RwLock<LayoutTables>>,
}

impl MemoryLayoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current tables.
    pub fn dump(&self) -> LayoutResult<LayoutTables> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LayoutTables>, StorageError> {
        self.tables.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LayoutTables>, StorageError> {
        self.tables.write().map_err(|_| StorageError::LockPoisoned)
    }

    /// Run `f` against a copy of one kind's tables and keep the copy only
    /// if `f` succeeds.
    fn transact<K, T, F>(&self, f: F) -> LayoutResult<T>
    where
        K: StorableKind,
        F: FnOnce(&mut KindTables<K>) -> Result<T, StorageError>,
    {
        let mut guard = self.write()?;
        let mut working = K::tables(&guard).clone();
        let out = f(&mut working).map_err(|e| {
            tracing::error!(kind = %K::TAG, error = %e, "memory transaction rolled back");
            e
        })?;
        *K::tables_mut(&mut guard) = working;
        Ok(out)
    }
}

#[async_trait]
impl LayoutStore for MemoryLayoutStore {
    async fn snapshot<K: StorableKind>(
        &self,
        module_id: &str,
        user_id: &str,
    ) -> LayoutResult<LayerSnapshot<K>> {
        let guard = self.read()?;
        let tables = K::tables(&guard);
        Ok(LayerSnapshot {
            baseline: tables
                .baseline
                .iter()
                .filter(|b| b.module_id == module_id)
                .cloned()
                .collect(),
            overrides: tables
                .overrides
                .iter()
                .filter(|o| o.module_id == module_id && o.user_id == user_id)
                .cloned()
                .collect(),
        })
    }

    async fn baseline_list<K: StorableKind>(
        &self,
        module_id: &str,
    ) -> LayoutResult<Vec<BaselineItem<K>>> {
        let guard = self.read()?;
        Ok(K::tables(&guard)
            .baseline
            .iter()
            .filter(|b| b.module_id == module_id)
            .cloned()
            .collect())
    }

    async fn override_list<K: StorableKind>(
        &self,
        module_id: &str,
    ) -> LayoutResult<Vec<OverrideItem<K>>> {
        let guard = self.read()?;
        Ok(K::tables(&guard)
            .overrides
            .iter()
            .filter(|o| o.module_id == module_id)
            .cloned()
            .collect())
    }

    async fn apply_baseline_plan<K: StorableKind>(
        &self,
        plan: &BaselinePlan<K>,
    ) -> LayoutResult<BatchOutcome> {
        self.transact::<K, _, _>(|tables| {
            let mut outcome = BatchOutcome::skipped(plan.skipped);
            for op in &plan.ops {
                match op {
                    BaselineOp::Insert(item) => {
                        tables.insert_baseline(item.clone())?;
                        outcome.inserted += 1;
                    }
                    BaselineOp::Update(item) => {
                        tables.update_baseline(item.clone())?;
                        outcome.updated += 1;
                    }
                    BaselineOp::Delete { value } => {
                        let removed = tables.delete_baseline(&plan.module_id, value, plan.delete_scope);
                        outcome.deleted += removed as usize;
                    }
                }
            }
            Ok(outcome)
        })
    }

    async fn apply_override_batch<K: StorableKind>(
        &self,
        module_id: &str,
        user_id: &str,
        rows: &[OverrideSubmission<K>],
        scope: OverrideMatchScope,
    ) -> LayoutResult<BatchOutcome> {
        let mut guard = self.write()?;
        let mut working = K::tables(&guard).clone();

        let existing = working.override_values(module_id, user_id, scope);
        let plan = route_override_batch(module_id, user_id, rows, &existing)?;

        let mut outcome = BatchOutcome::skipped(plan.skipped);
        for op in plan.ops {
            match op {
                OverrideOp::Insert(item) => {
                    working.overrides.push(item);
                    outcome.inserted += 1;
                }
                OverrideOp::Update(write) => {
                    match working.find_override_mut(module_id, user_id, &write.value) {
                        Some(row) => {
                            write.apply_to(row);
                            outcome.updated += 1;
                        }
                        None => {
                            tracing::warn!(
                                kind = %K::TAG,
                                module_id,
                                user_id,
                                value = %write.value,
                                "override update matched no row in module"
                            );
                            outcome.skipped += 1;
                        }
                    }
                }
            }
        }

        *K::tables_mut(&mut guard) = working;
        Ok(outcome)
    }

    async fn reset_overrides<K: StorableKind>(
        &self,
        module_id: &str,
        user_id: &str,
    ) -> LayoutResult<u64> {
        self.transact::<K, _, _>(|tables| {
            let before = tables.overrides.len();
            tables
                .overrides
                .retain(|o| !(o.module_id == module_id && o.user_id == user_id));
            Ok((before - tables.overrides.len()) as u64)
        })
    }

    async fn nullify_fields<K: StorableKind>(
        &self,
        module_id: &str,
        plan: &NullifyPlan<K>,
    ) -> LayoutResult<u64> {
        self.transact::<K, _, _>(|tables| {
            let mut touched = 0;
            for entry in &plan.entries {
                for row in tables
                    .overrides
                    .iter_mut()
                    .filter(|o| o.module_id == module_id && o.value == entry.value)
                {
                    entry.apply(row);
                    touched += 1;
                }
            }
            Ok(touched)
        })
    }

    async fn set_column_width(
        &self,
        module_id: &str,
        user_id: &str,
        value: &str,
        width: f64,
    ) -> LayoutResult<BatchOutcome> {
        self.transact::<Column, _, _>(|tables| {
            let mut outcome = BatchOutcome::default();
            match tables.find_override_mut(module_id, user_id, value) {
                Some(row) => {
                    row.overrides.width = Some(width);
                    outcome.updated = 1;
                }
                None => {
                    let mut row = OverrideItem::<Column>::blank(new_item_id(), module_id, user_id, value);
                    row.overrides.width = Some(width);
                    tables.overrides.push(row);
                    outcome.inserted = 1;
                }
            }
            Ok(outcome)
        })
    }
}
