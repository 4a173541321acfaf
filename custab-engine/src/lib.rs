//! CUSTAB Engine - Layout Service
//!
//! Validates request keys, plans batches, drives a [`LayoutStore`] and logs
//! every operation. Boundary layers (HTTP handlers, RPC services) call into
//! [`LayoutEngine`] and wrap results in [`response::Envelope`].

pub mod response;
pub mod telemetry;

use custab_core::{
    decode_baseline_batch, decode_nullify_request, decode_override_batch, decode_width_request,
    merge_layers, order_baseline, plan_baseline_batch, plan_nullify, require_key,
    validate_override_batch, validate_width, BaselineItem, BaselineSubmission, BatchOutcome,
    EffectiveItem, LayoutConfig, LayoutError, LayoutResult, OverrideItem, OverrideSubmission,
    RequiredKey, StatusTag, ValidationError,
};
use custab_storage::{DbConfig, LayoutStore, PgLayoutStore, StorableKind};
use std::collections::BTreeMap;

pub use response::{Envelope, ErrorCode};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};

/// Log a failed operation: caller mistakes at `warn`, store failures at
/// `error`.
fn log_failure(err: LayoutError) -> LayoutError {
    if err.is_validation() {
        tracing::warn!(error = %err, "request rejected");
    } else {
        tracing::error!(error = %err, "operation failed");
    }
    err
}

/// Layered layout service over a store.
#[derive(Debug, Clone)]
pub struct LayoutEngine<S> {
    store: S,
    config: LayoutConfig,
}

impl LayoutEngine<PgLayoutStore> {
    /// Build a PostgreSQL-backed engine from `CUSTAB_*` environment
    /// variables.
    pub fn from_env() -> LayoutResult<Self> {
        let config = LayoutConfig::from_env()?;
        let store = PgLayoutStore::from_config(&DbConfig::from_env())?;
        Ok(Self::new(store, config))
    }
}

impl<S: LayoutStore> LayoutEngine<S> {
    pub fn new(store: S, config: LayoutConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Baseline rows of a module ordered by seq.
    #[tracing::instrument(skip_all, fields(kind = %K::TAG, module_id = %module_id))]
    pub async fn read_baseline<K: StorableKind>(
        &self,
        module_id: &str,
    ) -> LayoutResult<Vec<BaselineItem<K>>> {
        require_key(module_id, RequiredKey::ModuleId).map_err(|e| log_failure(e.into()))?;

        let rows = self
            .store
            .baseline_list::<K>(module_id)
            .await
            .map_err(log_failure)?;
        Ok(order_baseline(rows))
    }

    /// Effective layout of a module for one user.
    ///
    /// A blank user id matches no overrides, so the result is the baseline
    /// with default override values.
    #[tracing::instrument(skip_all, fields(kind = %K::TAG, module_id = %module_id, user_id = %user_id))]
    pub async fn read_effective<K: StorableKind>(
        &self,
        module_id: &str,
        user_id: &str,
    ) -> LayoutResult<Vec<EffectiveItem<K>>> {
        require_key(module_id, RequiredKey::ModuleId).map_err(|e| log_failure(e.into()))?;

        if user_id.trim().is_empty() {
            let baseline = self
                .store
                .baseline_list::<K>(module_id)
                .await
                .map_err(log_failure)?;
            return Ok(merge_layers(baseline, Vec::new()));
        }

        let snapshot = self
            .store
            .snapshot::<K>(module_id, user_id)
            .await
            .map_err(log_failure)?;
        tracing::debug!(
            baseline = snapshot.baseline.len(),
            overrides = snapshot.overrides.len(),
            "merging layers"
        );
        Ok(merge_layers(snapshot.baseline, snapshot.overrides))
    }

    /// Override rows of a module across all users.
    #[tracing::instrument(skip_all, fields(kind = %K::TAG, module_id = %module_id))]
    pub async fn list_overrides<K: StorableKind>(
        &self,
        module_id: &str,
    ) -> LayoutResult<Vec<OverrideItem<K>>> {
        require_key(module_id, RequiredKey::ModuleId).map_err(|e| log_failure(e.into()))?;

        self.store
            .override_list::<K>(module_id)
            .await
            .map_err(log_failure)
    }

    // ========================================================================
    // BASELINE WRITES
    // ========================================================================

    /// Apply an administrator batch to a module's baseline, all or nothing.
    #[tracing::instrument(skip_all, fields(kind = %K::TAG, module_id = %module_id, rows = rows.len()))]
    pub async fn apply_baseline_batch<K: StorableKind>(
        &self,
        module_id: &str,
        rows: Vec<BaselineSubmission<K>>,
    ) -> LayoutResult<BatchOutcome> {
        require_key(module_id, RequiredKey::ModuleId).map_err(|e| log_failure(e.into()))?;

        let plan = plan_baseline_batch(module_id, rows, self.config.baseline_delete_scope)
            .map_err(|e| log_failure(e.into()))?;
        let outcome = self
            .store
            .apply_baseline_plan(&plan)
            .await
            .map_err(log_failure)?;

        tracing::info!(
            inserted = outcome.inserted,
            updated = outcome.updated,
            deleted = outcome.deleted,
            skipped = outcome.skipped,
            delete_scope = %self.config.baseline_delete_scope,
            "baseline batch applied"
        );
        Ok(outcome)
    }

    /// Decode and apply a JSON baseline batch.
    pub async fn apply_baseline_payload<K: StorableKind>(
        &self,
        module_id: &str,
        body: &[u8],
    ) -> LayoutResult<BatchOutcome> {
        let rows = decode_baseline_batch::<K>(body).map_err(|e| log_failure(e.into()))?;
        self.apply_baseline_batch(module_id, rows).await
    }

    // ========================================================================
    // OVERRIDE WRITES
    // ========================================================================

    /// Apply a user's override batch. Only Update rows write; each routes to
    /// an insert or an update depending on whether the user already has a
    /// row for the value.
    #[tracing::instrument(
        skip_all,
        fields(kind = %K::TAG, module_id = %module_id, user_id = %user_id, rows = rows.len())
    )]
    pub async fn apply_override_batch<K: StorableKind>(
        &self,
        module_id: &str,
        user_id: &str,
        rows: Vec<OverrideSubmission<K>>,
    ) -> LayoutResult<BatchOutcome> {
        require_key(module_id, RequiredKey::ModuleId).map_err(|e| log_failure(e.into()))?;
        require_key(user_id, RequiredKey::UserId).map_err(|e| log_failure(e.into()))?;
        validate_override_batch(&rows).map_err(|e| log_failure(e.into()))?;

        for (position, row) in rows.iter().enumerate() {
            if matches!(row.status, StatusTag::Create | StatusTag::Delete) {
                tracing::debug!(
                    position,
                    value = %row.value,
                    status = %row.status,
                    "override row ignored: only update rows write"
                );
            }
        }

        let outcome = self
            .store
            .apply_override_batch(module_id, user_id, &rows, self.config.override_match_scope)
            .await
            .map_err(log_failure)?;

        tracing::info!(
            inserted = outcome.inserted,
            updated = outcome.updated,
            skipped = outcome.skipped,
            match_scope = %self.config.override_match_scope,
            "override batch applied"
        );
        Ok(outcome)
    }

    /// Decode and apply a JSON override batch.
    pub async fn apply_override_payload<K: StorableKind>(
        &self,
        module_id: &str,
        user_id: &str,
        body: &[u8],
    ) -> LayoutResult<BatchOutcome> {
        let rows = decode_override_batch::<K>(body).map_err(|e| log_failure(e.into()))?;
        self.apply_override_batch(module_id, user_id, rows).await
    }

    /// Remove every override the user has in the module.
    #[tracing::instrument(skip_all, fields(kind = %K::TAG, module_id = %module_id, user_id = %user_id))]
    pub async fn reset_overrides<K: StorableKind>(
        &self,
        module_id: &str,
        user_id: &str,
    ) -> LayoutResult<u64> {
        require_key(module_id, RequiredKey::ModuleId).map_err(|e| log_failure(e.into()))?;
        require_key(user_id, RequiredKey::UserId).map_err(|e| log_failure(e.into()))?;

        let removed = self
            .store
            .reset_overrides::<K>(module_id, user_id)
            .await
            .map_err(log_failure)?;
        tracing::info!(removed, "overrides reset");
        Ok(removed)
    }

    /// Clear whitelisted override fields for every user.
    ///
    /// Unknown field names are ignored.
    #[tracing::instrument(skip_all, fields(kind = %K::TAG, module_id = %module_id, values = request.len()))]
    pub async fn nullify_fields<K: StorableKind>(
        &self,
        module_id: &str,
        request: &BTreeMap<String, Vec<String>>,
    ) -> LayoutResult<u64> {
        require_key(module_id, RequiredKey::ModuleId).map_err(|e| log_failure(e.into()))?;

        let plan = plan_nullify::<K>(request);
        for dropped in &plan.dropped {
            tracing::debug!(value = %dropped.value, field = %dropped.field, "field not nullable, dropped");
        }
        if plan.entries.is_empty() {
            tracing::info!(touched = 0u64, "nothing to nullify");
            return Ok(0);
        }

        let touched = self
            .store
            .nullify_fields(module_id, &plan)
            .await
            .map_err(log_failure)?;
        tracing::info!(touched, entries = plan.entries.len(), "override fields nullified");
        Ok(touched)
    }

    /// Decode and apply a JSON nullify request.
    pub async fn nullify_payload<K: StorableKind>(
        &self,
        module_id: &str,
        body: &[u8],
    ) -> LayoutResult<u64> {
        let request = decode_nullify_request(body).map_err(|e| log_failure(e.into()))?;
        self.nullify_fields::<K>(module_id, &request).await
    }

    /// Set one column's width for one user.
    #[tracing::instrument(
        skip_all,
        fields(kind = "column", module_id = %module_id, user_id = %user_id, value = %value)
    )]
    pub async fn set_column_width(
        &self,
        module_id: &str,
        user_id: &str,
        value: &str,
        width: Option<f64>,
    ) -> LayoutResult<BatchOutcome> {
        require_key(module_id, RequiredKey::ModuleId).map_err(|e| log_failure(e.into()))?;
        require_key(user_id, RequiredKey::UserId).map_err(|e| log_failure(e.into()))?;
        require_key(value, RequiredKey::Value).map_err(|e| log_failure(e.into()))?;
        let width = width
            .ok_or_else(|| ValidationError::malformed("width is required"))
            .and_then(|w| validate_width(w).map(|_| w))
            .map_err(|e| log_failure(e.into()))?;

        let outcome = self
            .store
            .set_column_width(module_id, user_id, value, width)
            .await
            .map_err(log_failure)?;
        tracing::info!(width, inserted = outcome.inserted, updated = outcome.updated, "column width set");
        Ok(outcome)
    }

    /// Decode and apply a JSON width request for `user_id`.
    pub async fn set_width_payload(&self, user_id: &str, body: &[u8]) -> LayoutResult<BatchOutcome> {
        let request = decode_width_request(body).map_err(|e| log_failure(e.into()))?;
        self.set_column_width(&request.module_id, user_id, &request.value, request.width)
            .await
    }
}
