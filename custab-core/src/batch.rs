//! Batch planning.
//!
//! A submitted batch is turned into a list of statements before any store is
//! touched, so every validation failure aborts with nothing written. Stores
//! then execute a plan inside one transaction.

use crate::config::DeleteScope;
use crate::entities::{BaselineItem, BaselineSubmission, OverrideItem, OverrideSubmission, StatusTag};
use crate::error::{RequiredKey, ValidationError};
use crate::kind::ItemKind;
use crate::new_item_id;
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// Row counts produced by one write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
}

impl BatchOutcome {
    pub fn skipped(count: usize) -> Self {
        Self {
            skipped: count,
            ..Self::default()
        }
    }

    /// Rows actually written.
    pub fn written(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// Sequence number for the row at `position` in a submission.
fn position_seq(position: usize) -> Result<i32, ValidationError> {
    i32::try_from(position)
        .map_err(|_| ValidationError::malformed(format!("batch too large at position {}", position)))
}

fn require_value(value: &str, position: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::malformed(format!(
            "row {} is missing its {}",
            position,
            RequiredKey::Value
        )));
    }
    Ok(())
}

// ============================================================================
// BASELINE
// ============================================================================

/// One baseline statement.
#[derive(Debug, Clone, PartialEq)]
pub enum BaselineOp<K: ItemKind> {
    Insert(BaselineItem<K>),
    /// Overwrite the row matched by `(module_id, id)`.
    Update(BaselineItem<K>),
    Delete { value: String },
}

/// Validated baseline batch for one module.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselinePlan<K: ItemKind> {
    pub module_id: String,
    pub delete_scope: DeleteScope,
    pub ops: Vec<BaselineOp<K>>,
    /// Rows submitted without a status.
    pub skipped: usize,
}

/// Turn a baseline submission into statements.
///
/// Position `i` in the submission becomes `seq = i` for creates and updates,
/// including positions held by unchanged rows.
pub fn plan_baseline_batch<K: ItemKind>(
    module_id: &str,
    rows: Vec<BaselineSubmission<K>>,
    delete_scope: DeleteScope,
) -> Result<BaselinePlan<K>, ValidationError> {
    let mut ops = Vec::with_capacity(rows.len());
    let mut skipped = 0;

    for (position, row) in rows.into_iter().enumerate() {
        let seq = position_seq(position)?;
        match row.status {
            StatusTag::Unchanged => skipped += 1,
            StatusTag::Create => {
                require_value(&row.value, position)?;
                ops.push(BaselineOp::Insert(baseline_row(module_id, new_item_id(), seq, row)));
            }
            StatusTag::Update => {
                let id = row.id.ok_or_else(|| {
                    ValidationError::malformed(format!("update at row {} has no id", position))
                })?;
                require_value(&row.value, position)?;
                ops.push(BaselineOp::Update(baseline_row(module_id, id, seq, row)));
            }
            StatusTag::Delete => {
                require_value(&row.value, position)?;
                ops.push(BaselineOp::Delete { value: row.value });
            }
        }
    }

    Ok(BaselinePlan {
        module_id: module_id.to_string(),
        delete_scope,
        ops,
        skipped,
    })
}

fn baseline_row<K: ItemKind>(
    module_id: &str,
    id: Uuid,
    seq: i32,
    row: BaselineSubmission<K>,
) -> BaselineItem<K> {
    BaselineItem {
        id,
        module_id: module_id.to_string(),
        value: row.value,
        name: row.name,
        fixed: row.fixed,
        seq,
        attrs: row.attrs,
    }
}

// ============================================================================
// OVERRIDES
// ============================================================================

/// Fields written onto an existing override row.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideWrite<K: ItemKind> {
    pub value: String,
    pub hidden: Option<bool>,
    pub seq: i32,
    pub overrides: K::Overrides,
}

impl<K: ItemKind> OverrideWrite<K> {
    /// Overwrite the writable fields of `item`, keeping its identity.
    pub fn apply_to(&self, item: &mut OverrideItem<K>) {
        item.hidden = self.hidden;
        item.seq = Some(self.seq);
        item.overrides = self.overrides.clone();
    }

    pub fn into_item(self, id: Uuid, module_id: &str, user_id: &str) -> OverrideItem<K> {
        OverrideItem {
            id,
            module_id: module_id.to_string(),
            user_id: user_id.to_string(),
            value: self.value,
            hidden: self.hidden,
            seq: Some(self.seq),
            overrides: self.overrides,
        }
    }
}

/// One override statement.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideOp<K: ItemKind> {
    Insert(OverrideItem<K>),
    /// Update the row matched by `(user_id, module_id, value)`.
    Update(OverrideWrite<K>),
}

/// Routed override batch for one `(module, user)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct OverridePlan<K: ItemKind> {
    pub module_id: String,
    pub user_id: String,
    pub ops: Vec<OverrideOp<K>>,
    /// Rows tagged anything other than Update.
    pub skipped: usize,
}

/// Check every Update row of an override batch before routing.
pub fn validate_override_batch<K: ItemKind>(
    rows: &[OverrideSubmission<K>],
) -> Result<(), ValidationError> {
    for (position, row) in rows.iter().enumerate() {
        if row.status != StatusTag::Update {
            continue;
        }
        position_seq(position)?;
        require_value(&row.value, position)?;
        K::validate_overrides(&row.overrides)?;
    }
    Ok(())
}

/// Route each Update row to an insert or an update.
///
/// `existing` holds the values the user already has override rows for. A
/// value inserted earlier in the same batch routes later rows for it to
/// update, so the batch never produces duplicate rows.
pub fn route_override_batch<K: ItemKind>(
    module_id: &str,
    user_id: &str,
    rows: &[OverrideSubmission<K>],
    existing: &HashSet<String>,
) -> Result<OverridePlan<K>, ValidationError> {
    validate_override_batch(rows)?;

    let mut inserted: HashSet<&str> = HashSet::new();
    let mut ops = Vec::new();
    let mut skipped = 0;

    for (position, row) in rows.iter().enumerate() {
        if row.status != StatusTag::Update {
            skipped += 1;
            continue;
        }
        let write = OverrideWrite {
            value: row.value.clone(),
            hidden: row.hidden,
            seq: position_seq(position)?,
            overrides: row.overrides.clone(),
        };
        if existing.contains(&row.value) || inserted.contains(row.value.as_str()) {
            ops.push(OverrideOp::Update(write));
        } else {
            inserted.insert(row.value.as_str());
            ops.push(OverrideOp::Insert(write.into_item(new_item_id(), module_id, user_id)));
        }
    }

    Ok(OverridePlan {
        module_id: module_id.to_string(),
        user_id: user_id.to_string(),
        ops,
        skipped,
    })
}
