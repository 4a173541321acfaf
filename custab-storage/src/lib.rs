//! CUSTAB Storage Layer
//!
//! The `LayoutStore` trait and its two implementations: an in-memory store
//! for tests and embedding, and a PostgreSQL store. Every write runs as one
//! all-or-nothing unit; every read sees one consistent snapshot.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use custab_core::{
    BaselineItem, BaselinePlan, BatchOutcome, Column, ColumnAttrs, ColumnOverrides, Filter,
    ItemKind, LayoutResult, NoExtras, NullifyPlan, OverrideItem, OverrideMatchScope,
    OverrideSubmission,
};
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;

pub use memory::{KindTables, LayoutTables, MemoryLayoutStore};
pub use postgres::{DbConfig, PgLayoutStore};

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Both layers of one module as seen by one user, read together.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSnapshot<K: ItemKind> {
    /// Baseline rows in storage order.
    pub baseline: Vec<BaselineItem<K>>,
    /// The user's override rows in the module.
    pub overrides: Vec<OverrideItem<K>>,
}

/// Async storage for baseline and override layers.
///
/// Methods are generic over the item kind; each kind lives in its own pair
/// of tables.
#[async_trait]
pub trait LayoutStore: Send + Sync {
    /// Read the module's baseline and the user's overrides in one snapshot.
    async fn snapshot<K: StorableKind>(
        &self,
        module_id: &str,
        user_id: &str,
    ) -> LayoutResult<LayerSnapshot<K>>;

    /// Baseline rows of a module in storage order.
    async fn baseline_list<K: StorableKind>(
        &self,
        module_id: &str,
    ) -> LayoutResult<Vec<BaselineItem<K>>>;

    /// Override rows of a module for every user.
    async fn override_list<K: StorableKind>(
        &self,
        module_id: &str,
    ) -> LayoutResult<Vec<OverrideItem<K>>>;

    /// Execute a baseline plan in one transaction.
    async fn apply_baseline_plan<K: StorableKind>(
        &self,
        plan: &BaselinePlan<K>,
    ) -> LayoutResult<BatchOutcome>;

    /// Route and execute an override batch in one transaction.
    ///
    /// Existing override values are read inside the same transaction,
    /// scoped per `scope`.
    async fn apply_override_batch<K: StorableKind>(
        &self,
        module_id: &str,
        user_id: &str,
        rows: &[OverrideSubmission<K>],
        scope: OverrideMatchScope,
    ) -> LayoutResult<BatchOutcome>;

    /// Delete every override row of `(module_id, user_id)`. Returns the
    /// number of rows removed.
    async fn reset_overrides<K: StorableKind>(
        &self,
        module_id: &str,
        user_id: &str,
    ) -> LayoutResult<u64>;

    /// Null the planned fields on every user's override rows. Returns the
    /// number of rows touched.
    async fn nullify_fields<K: StorableKind>(
        &self,
        module_id: &str,
        plan: &NullifyPlan<K>,
    ) -> LayoutResult<u64>;

    /// Set one column width for one user, inserting the override row when
    /// it does not exist yet.
    async fn set_column_width(
        &self,
        module_id: &str,
        user_id: &str,
        value: &str,
        width: f64,
    ) -> LayoutResult<BatchOutcome>;
}

// ============================================================================
// STORABLE KINDS
// ============================================================================

/// Parameter list borrowed from an item for a SQL statement.
pub type SqlParams<'a> = Vec<&'a (dyn ToSql + Sync)>;

/// Storage mapping of an item kind.
pub trait StorableKind: ItemKind {
    const BASELINE_TABLE: &'static str;
    const OVERRIDE_TABLE: &'static str;
    /// Baseline columns after `id, module_id, value, name, fixed, seq`.
    const BASELINE_EXTRA_COLUMNS: &'static [&'static str];
    /// Override columns after `id, module_id, user_id, value, hidden, seq`.
    const OVERRIDE_EXTRA_COLUMNS: &'static [&'static str];

    fn tables(tables: &LayoutTables) -> &KindTables<Self>;

    fn tables_mut(tables: &mut LayoutTables) -> &mut KindTables<Self>;

    /// Values for `BASELINE_EXTRA_COLUMNS`, in order.
    fn attrs_params(attrs: &Self::Attrs) -> SqlParams<'_>;

    /// Values for `OVERRIDE_EXTRA_COLUMNS`, in order.
    fn overrides_params(overrides: &Self::Overrides) -> SqlParams<'_>;

    /// Read `BASELINE_EXTRA_COLUMNS` starting at column `offset`.
    fn attrs_from_row(row: &Row, offset: usize) -> Result<Self::Attrs, tokio_postgres::Error>;

    /// Read `OVERRIDE_EXTRA_COLUMNS` starting at column `offset`.
    fn overrides_from_row(row: &Row, offset: usize) -> Result<Self::Overrides, tokio_postgres::Error>;
}

impl StorableKind for Column {
    const BASELINE_TABLE: &'static str = "baseline_columns";
    const OVERRIDE_TABLE: &'static str = "override_columns";
    const BASELINE_EXTRA_COLUMNS: &'static [&'static str] = &["location", "rule"];
    const OVERRIDE_EXTRA_COLUMNS: &'static [&'static str] = &["frozen", "location", "rule", "width"];

    fn tables(tables: &LayoutTables) -> &KindTables<Self> {
        &tables.columns
    }

    fn tables_mut(tables: &mut LayoutTables) -> &mut KindTables<Self> {
        &mut tables.columns
    }

    fn attrs_params(attrs: &ColumnAttrs) -> SqlParams<'_> {
        vec![&attrs.location as &(dyn ToSql + Sync), &attrs.rule]
    }

    fn overrides_params(overrides: &ColumnOverrides) -> SqlParams<'_> {
        vec![
            &overrides.frozen as &(dyn ToSql + Sync),
            &overrides.location,
            &overrides.rule,
            &overrides.width,
        ]
    }

    fn attrs_from_row(row: &Row, offset: usize) -> Result<ColumnAttrs, tokio_postgres::Error> {
        Ok(ColumnAttrs {
            location: row.try_get(offset)?,
            rule: row.try_get(offset + 1)?,
        })
    }

    fn overrides_from_row(row: &Row, offset: usize) -> Result<ColumnOverrides, tokio_postgres::Error> {
        Ok(ColumnOverrides {
            frozen: row.try_get(offset)?,
            location: row.try_get(offset + 1)?,
            rule: row.try_get(offset + 2)?,
            width: row.try_get(offset + 3)?,
        })
    }
}

impl StorableKind for Filter {
    const BASELINE_TABLE: &'static str = "baseline_filters";
    const OVERRIDE_TABLE: &'static str = "override_filters";
    const BASELINE_EXTRA_COLUMNS: &'static [&'static str] = &[];
    const OVERRIDE_EXTRA_COLUMNS: &'static [&'static str] = &[];

    fn tables(tables: &LayoutTables) -> &KindTables<Self> {
        &tables.filters
    }

    fn tables_mut(tables: &mut LayoutTables) -> &mut KindTables<Self> {
        &mut tables.filters
    }

    fn attrs_params(_attrs: &NoExtras) -> SqlParams<'_> {
        Vec::new()
    }

    fn overrides_params(_overrides: &NoExtras) -> SqlParams<'_> {
        Vec::new()
    }

    fn attrs_from_row(_row: &Row, _offset: usize) -> Result<NoExtras, tokio_postgres::Error> {
        Ok(NoExtras {})
    }

    fn overrides_from_row(_row: &Row, _offset: usize) -> Result<NoExtras, tokio_postgres::Error> {
        Ok(NoExtras {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custab_core::{ColumnField, FilterField, OverrideField};

    #[test]
    fn test_param_counts_match_columns() {
        let attrs = ColumnAttrs::default();
        let overrides = ColumnOverrides::default();
        assert_eq!(Column::attrs_params(&attrs).len(), Column::BASELINE_EXTRA_COLUMNS.len());
        assert_eq!(
            Column::overrides_params(&overrides).len(),
            Column::OVERRIDE_EXTRA_COLUMNS.len()
        );
        assert_eq!(Filter::attrs_params(&NoExtras {}).len(), 0);
        assert_eq!(Filter::overrides_params(&NoExtras {}).len(), 0);
    }

    #[test]
    fn test_nullable_fields_are_storage_columns() {
        // hidden lives in the shared override columns
        for field in ColumnField::ALL {
            let name = field.name();
            assert!(name == "hidden" || Column::OVERRIDE_EXTRA_COLUMNS.contains(&name));
        }
        for field in FilterField::ALL {
            assert_eq!(field.name(), "hidden");
        }
    }
}
