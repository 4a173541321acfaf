//! PostgreSQL layout store.
//!
//! One pooled connection per operation, returned to the pool on every exit
//! path. Writes run in a single transaction that rolls back when dropped
//! uncommitted; reads run in a read-only REPEATABLE READ transaction so both
//! layers come from the same snapshot.

use crate::{LayerSnapshot, LayoutStore, StorableKind};
use async_trait::async_trait;
use custab_core::{
    new_item_id, route_override_batch, BaselineItem, BaselineOp, BaselinePlan, BatchOutcome,
    Column, ConfigError, DeleteScope, LayoutResult, NullifyPlan, OverrideField, OverrideItem,
    OverrideMatchScope, OverrideOp, OverrideSubmission, StorageError,
};
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime};
use std::collections::HashSet;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{GenericClient, IsolationLevel, NoTls, Row};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait timeout when acquiring a connection
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "custab".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create a configuration through an arbitrary key lookup, falling back
    /// to development defaults for unset or unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: lookup("CUSTAB_DB_HOST").unwrap_or(defaults.host),
            port: lookup("CUSTAB_DB_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: lookup("CUSTAB_DB_NAME").unwrap_or(defaults.dbname),
            user: lookup("CUSTAB_DB_USER").unwrap_or(defaults.user),
            password: lookup("CUSTAB_DB_PASSWORD").unwrap_or(defaults.password),
            max_size: lookup("CUSTAB_DB_POOL_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: lookup("CUSTAB_DB_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> Result<Pool, ConfigError> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ConfigError::InvalidValue {
                field: "database".to_string(),
                value: format!("{}:{}/{}", self.host, self.port, self.dbname),
                reason: format!("Failed to create pool: {}", e),
            })
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

/// Map a driver error. Unique violations keep their constraint name.
fn pg_error(err: tokio_postgres::Error) -> StorageError {
    tracing::error!("Database error: {:?}", err);

    if let Some(db_error) = err.as_db_error() {
        if db_error.code() == &SqlState::UNIQUE_VIOLATION {
            return StorageError::ConstraintViolation {
                constraint: db_error.constraint().unwrap_or("unique").to_string(),
                reason: db_error.message().to_string(),
            };
        }
        return StorageError::TransactionFailed {
            reason: db_error.message().to_string(),
        };
    }

    StorageError::TransactionFailed {
        reason: err.to_string(),
    }
}

fn pool_error(err: PoolError) -> StorageError {
    tracing::error!("Connection pool error: {:?}", err);

    let reason = match err {
        PoolError::Timeout(_) => "connection pool exhausted".to_string(),
        PoolError::Closed => "connection pool is closed".to_string(),
        other => format!("failed to acquire database connection: {}", other),
    };
    StorageError::ConnectionFailed { reason }
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Idempotent DDL for the four layout tables.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS baseline_columns (
    ordinal   BIGINT GENERATED ALWAYS AS IDENTITY,
    id        UUID PRIMARY KEY,
    module_id TEXT NOT NULL,
    value     TEXT NOT NULL,
    name      TEXT NOT NULL DEFAULT '',
    fixed     BOOLEAN NOT NULL DEFAULT FALSE,
    seq       INTEGER NOT NULL,
    location  TEXT NOT NULL DEFAULT '',
    rule      TEXT NOT NULL DEFAULT '',
    CONSTRAINT baseline_columns_module_value_key UNIQUE (module_id, value)
);

CREATE TABLE IF NOT EXISTS override_columns (
    id        UUID PRIMARY KEY,
    module_id TEXT NOT NULL,
    user_id   TEXT NOT NULL,
    value     TEXT NOT NULL,
    hidden    BOOLEAN,
    seq       INTEGER,
    frozen    BOOLEAN,
    location  TEXT,
    rule      TEXT,
    width     DOUBLE PRECISION,
    CONSTRAINT override_columns_user_module_value_key UNIQUE (user_id, module_id, value)
);

CREATE TABLE IF NOT EXISTS baseline_filters (
    ordinal   BIGINT GENERATED ALWAYS AS IDENTITY,
    id        UUID PRIMARY KEY,
    module_id TEXT NOT NULL,
    value     TEXT NOT NULL,
    name      TEXT NOT NULL DEFAULT '',
    fixed     BOOLEAN NOT NULL DEFAULT FALSE,
    seq       INTEGER NOT NULL,
    CONSTRAINT baseline_filters_module_value_key UNIQUE (module_id, value)
);

CREATE TABLE IF NOT EXISTS override_filters (
    id        UUID PRIMARY KEY,
    module_id TEXT NOT NULL,
    user_id   TEXT NOT NULL,
    value     TEXT NOT NULL,
    hidden    BOOLEAN,
    seq       INTEGER,
    CONSTRAINT override_filters_user_module_value_key UNIQUE (user_id, module_id, value)
);

CREATE INDEX IF NOT EXISTS override_columns_module_value_idx ON override_columns (module_id, value);
CREATE INDEX IF NOT EXISTS override_filters_module_value_idx ON override_filters (module_id, value);
"#;

// ============================================================================
// SQL BUILDERS
// ============================================================================

const BASELINE_COLUMNS: [&str; 6] = ["id", "module_id", "value", "name", "fixed", "seq"];
const OVERRIDE_COLUMNS: [&str; 6] = ["id", "module_id", "user_id", "value", "hidden", "seq"];

fn column_list(shared: &[&str], extra: &[&str]) -> String {
    shared.iter().chain(extra.iter()).copied().collect::<Vec<_>>().join(", ")
}

fn placeholders(from: usize, count: usize) -> String {
    (from..from + count)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn baseline_select<K: StorableKind>() -> String {
    format!(
        "SELECT {} FROM {} WHERE module_id = $1 ORDER BY ordinal",
        column_list(&BASELINE_COLUMNS, K::BASELINE_EXTRA_COLUMNS),
        K::BASELINE_TABLE
    )
}

fn override_select<K: StorableKind>(by_user: bool) -> String {
    let filter = if by_user {
        "module_id = $1 AND user_id = $2"
    } else {
        "module_id = $1"
    };
    format!(
        "SELECT {} FROM {} WHERE {} ORDER BY user_id, value",
        column_list(&OVERRIDE_COLUMNS, K::OVERRIDE_EXTRA_COLUMNS),
        K::OVERRIDE_TABLE,
        filter
    )
}

fn baseline_insert<K: StorableKind>() -> String {
    let count = BASELINE_COLUMNS.len() + K::BASELINE_EXTRA_COLUMNS.len();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        K::BASELINE_TABLE,
        column_list(&BASELINE_COLUMNS, K::BASELINE_EXTRA_COLUMNS),
        placeholders(1, count)
    )
}

/// `$1` id, `$2` module_id, then the assignments.
fn baseline_update<K: StorableKind>() -> String {
    let assigned: Vec<&str> = ["value", "name", "fixed", "seq"]
        .into_iter()
        .chain(K::BASELINE_EXTRA_COLUMNS.iter().copied())
        .collect();
    let sets = assigned
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{} = ${}", col, i + 3))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} SET {} WHERE id = $1 AND module_id = $2",
        K::BASELINE_TABLE,
        sets
    )
}

const OVERRIDE_CONFLICT: &str = "ON CONFLICT (user_id, module_id, value)";

fn override_insert<K: StorableKind>() -> String {
    let count = OVERRIDE_COLUMNS.len() + K::OVERRIDE_EXTRA_COLUMNS.len();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        K::OVERRIDE_TABLE,
        column_list(&OVERRIDE_COLUMNS, K::OVERRIDE_EXTRA_COLUMNS),
        placeholders(1, count)
    )
}

/// Insert that falls back to overwriting `assigned` on a concurrent row for
/// the same (user, module, value). Returns `true` when the row was inserted.
fn override_upsert<K: StorableKind>(assigned: &[&str]) -> String {
    let sets = assigned
        .iter()
        .map(|col| format!("{} = EXCLUDED.{}", col, col))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{} {} DO UPDATE SET {} RETURNING (xmax = 0)",
        override_insert::<K>(),
        OVERRIDE_CONFLICT,
        sets
    )
}

/// Upsert carrying every writable override column.
fn override_row_upsert<K: StorableKind>() -> String {
    let assigned: Vec<&str> = ["hidden", "seq"]
        .into_iter()
        .chain(K::OVERRIDE_EXTRA_COLUMNS.iter().copied())
        .collect();
    override_upsert::<K>(&assigned)
}

/// Upsert that only touches `width` on an existing row.
fn width_upsert() -> String {
    override_upsert::<Column>(&["width"])
}

/// `$1` module_id, `$2` user_id, `$3` value, then the assignments.
fn override_update<K: StorableKind>() -> String {
    let assigned: Vec<&str> = ["hidden", "seq"]
        .into_iter()
        .chain(K::OVERRIDE_EXTRA_COLUMNS.iter().copied())
        .collect();
    let sets = assigned
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{} = ${}", col, i + 4))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} SET {} WHERE module_id = $1 AND user_id = $2 AND value = $3",
        K::OVERRIDE_TABLE,
        sets
    )
}

/// Column names come from the field enum, never from the request.
fn nullify_update<K: StorableKind>(fields: impl Iterator<Item = K::Field>) -> String {
    let sets = fields
        .map(|field| format!("{} = NULL", field.name()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} SET {} WHERE module_id = $1 AND value = $2",
        K::OVERRIDE_TABLE,
        sets
    )
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn baseline_from_row<K: StorableKind>(row: &Row) -> Result<BaselineItem<K>, tokio_postgres::Error> {
    Ok(BaselineItem {
        id: row.try_get(0)?,
        module_id: row.try_get(1)?,
        value: row.try_get(2)?,
        name: row.try_get(3)?,
        fixed: row.try_get(4)?,
        seq: row.try_get(5)?,
        attrs: K::attrs_from_row(row, BASELINE_COLUMNS.len())?,
    })
}

fn override_from_row<K: StorableKind>(row: &Row) -> Result<OverrideItem<K>, tokio_postgres::Error> {
    Ok(OverrideItem {
        id: row.try_get(0)?,
        module_id: row.try_get(1)?,
        user_id: row.try_get(2)?,
        value: row.try_get(3)?,
        hidden: row.try_get(4)?,
        seq: row.try_get(5)?,
        overrides: K::overrides_from_row(row, OVERRIDE_COLUMNS.len())?,
    })
}

fn baseline_params<K: StorableKind>(item: &BaselineItem<K>) -> Vec<&(dyn ToSql + Sync)> {
    let mut params: Vec<&(dyn ToSql + Sync)> = vec![
        &item.id as &(dyn ToSql + Sync),
        &item.module_id,
        &item.value,
        &item.name,
        &item.fixed,
        &item.seq,
    ];
    params.extend(K::attrs_params(&item.attrs));
    params
}

fn override_params<K: StorableKind>(item: &OverrideItem<K>) -> Vec<&(dyn ToSql + Sync)> {
    let mut params: Vec<&(dyn ToSql + Sync)> = vec![
        &item.id as &(dyn ToSql + Sync),
        &item.module_id,
        &item.user_id,
        &item.value,
        &item.hidden,
        &item.seq,
    ];
    params.extend(K::overrides_params(&item.overrides));
    params
}

async fn query_baseline<K: StorableKind, C: GenericClient + Sync>(
    client: &C,
    module_id: &str,
) -> Result<Vec<BaselineItem<K>>, tokio_postgres::Error> {
    let rows = client.query(&baseline_select::<K>(), &[&module_id]).await?;
    rows.iter().map(baseline_from_row::<K>).collect()
}

// ============================================================================
// STORE
// ============================================================================

/// PostgreSQL-backed layout store.
#[derive(Clone)]
pub struct PgLayoutStore {
    pool: Pool,
}

impl PgLayoutStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &DbConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.create_pool()?))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Create the layout tables if they do not exist.
    pub async fn migrate(&self) -> LayoutResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA).await.map_err(pg_error)?;
        tracing::info!("layout schema applied");
        Ok(())
    }

    async fn get_conn(&self) -> Result<deadpool_postgres::Object, StorageError> {
        self.pool.get().await.map_err(pool_error)
    }
}

#[async_trait]
impl LayoutStore for PgLayoutStore {
    async fn snapshot<K: StorableKind>(
        &self,
        module_id: &str,
        user_id: &str,
    ) -> LayoutResult<LayerSnapshot<K>> {
        let mut conn = self.get_conn().await?;
        let tx = conn
            .build_transaction()
            .isolation_level(IsolationLevel::RepeatableRead)
            .read_only(true)
            .start()
            .await
            .map_err(pg_error)?;

        let baseline = query_baseline::<K, _>(&*tx, module_id).await.map_err(pg_error)?;
        let overrides = tx
            .query(&override_select::<K>(true), &[&module_id, &user_id])
            .await
            .map_err(pg_error)?
            .iter()
            .map(override_from_row::<K>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(pg_error)?;

        tx.commit().await.map_err(pg_error)?;
        Ok(LayerSnapshot { baseline, overrides })
    }

    async fn baseline_list<K: StorableKind>(
        &self,
        module_id: &str,
    ) -> LayoutResult<Vec<BaselineItem<K>>> {
        let conn = self.get_conn().await?;
        let rows = query_baseline::<K, _>(&**conn, module_id).await.map_err(pg_error)?;
        Ok(rows)
    }

    async fn override_list<K: StorableKind>(
        &self,
        module_id: &str,
    ) -> LayoutResult<Vec<OverrideItem<K>>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(&override_select::<K>(false), &[&module_id])
            .await
            .map_err(pg_error)?;
        let items = rows
            .iter()
            .map(override_from_row::<K>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(pg_error)?;
        Ok(items)
    }

    async fn apply_baseline_plan<K: StorableKind>(
        &self,
        plan: &BaselinePlan<K>,
    ) -> LayoutResult<BatchOutcome> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(pg_error)?;

        let insert_sql = baseline_insert::<K>();
        let update_sql = baseline_update::<K>();
        let mut outcome = BatchOutcome::skipped(plan.skipped);

        for op in &plan.ops {
            match op {
                BaselineOp::Insert(item) => {
                    tx.execute(&insert_sql, &baseline_params(item))
                        .await
                        .map_err(pg_error)?;
                    outcome.inserted += 1;
                }
                BaselineOp::Update(item) => {
                    let mut params: Vec<&(dyn ToSql + Sync)> = vec![
                        &item.id as &(dyn ToSql + Sync),
                        &item.module_id,
                        &item.value,
                        &item.name,
                        &item.fixed,
                        &item.seq,
                    ];
                    params.extend(K::attrs_params(&item.attrs));
                    let changed = tx.execute(&update_sql, &params).await.map_err(pg_error)?;
                    if changed == 0 {
                        // dropping tx rolls back everything before this row
                        return Err(StorageError::NotFound {
                            kind: K::TAG,
                            module_id: item.module_id.clone(),
                            id: item.id,
                        }
                        .into());
                    }
                    outcome.updated += 1;
                }
                BaselineOp::Delete { value } => {
                    let removed = match plan.delete_scope {
                        DeleteScope::Module => {
                            let sql = format!(
                                "DELETE FROM {} WHERE module_id = $1 AND value = $2",
                                K::BASELINE_TABLE
                            );
                            tx.execute(&sql, &[&plan.module_id, value]).await
                        }
                        DeleteScope::Global => {
                            let sql = format!("DELETE FROM {} WHERE value = $1", K::BASELINE_TABLE);
                            tx.execute(&sql, &[value]).await
                        }
                    }
                    .map_err(pg_error)?;
                    outcome.deleted += removed as usize;
                }
            }
        }

        tx.commit().await.map_err(pg_error)?;
        Ok(outcome)
    }

    async fn apply_override_batch<K: StorableKind>(
        &self,
        module_id: &str,
        user_id: &str,
        rows: &[OverrideSubmission<K>],
        scope: OverrideMatchScope,
    ) -> LayoutResult<BatchOutcome> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(pg_error)?;

        let existing_rows = match scope {
            OverrideMatchScope::Module => {
                let sql = format!(
                    "SELECT value FROM {} WHERE user_id = $1 AND module_id = $2",
                    K::OVERRIDE_TABLE
                );
                tx.query(&sql, &[&user_id, &module_id]).await
            }
            OverrideMatchScope::UserWide => {
                let sql = format!("SELECT value FROM {} WHERE user_id = $1", K::OVERRIDE_TABLE);
                tx.query(&sql, &[&user_id]).await
            }
        }
        .map_err(pg_error)?;
        let existing = existing_rows
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<HashSet<_>, _>>()
            .map_err(pg_error)?;

        let plan = route_override_batch(module_id, user_id, rows, &existing)?;

        let insert_sql = override_row_upsert::<K>();
        let update_sql = override_update::<K>();
        let mut outcome = BatchOutcome::skipped(plan.skipped);

        for op in &plan.ops {
            match op {
                OverrideOp::Insert(item) => {
                    let row = tx
                        .query_one(&insert_sql, &override_params(item))
                        .await
                        .map_err(pg_error)?;
                    if row.try_get::<_, bool>(0).map_err(pg_error)? {
                        outcome.inserted += 1;
                    } else {
                        outcome.updated += 1;
                    }
                }
                OverrideOp::Update(write) => {
                    let mut params: Vec<&(dyn ToSql + Sync)> = vec![
                        &module_id as &(dyn ToSql + Sync),
                        &user_id,
                        &write.value,
                        &write.hidden,
                        &write.seq,
                    ];
                    params.extend(K::overrides_params(&write.overrides));
                    let changed = tx.execute(&update_sql, &params).await.map_err(pg_error)?;
                    if changed == 0 {
                        tracing::warn!(
                            kind = %K::TAG,
                            module_id,
                            user_id,
                            value = %write.value,
                            "override update matched no row in module"
                        );
                        outcome.skipped += 1;
                    } else {
                        outcome.updated += 1;
                    }
                }
            }
        }

        tx.commit().await.map_err(pg_error)?;
        Ok(outcome)
    }

    async fn reset_overrides<K: StorableKind>(
        &self,
        module_id: &str,
        user_id: &str,
    ) -> LayoutResult<u64> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "DELETE FROM {} WHERE module_id = $1 AND user_id = $2",
            K::OVERRIDE_TABLE
        );
        let removed = conn
            .execute(&sql, &[&module_id, &user_id])
            .await
            .map_err(pg_error)?;
        Ok(removed)
    }

    async fn nullify_fields<K: StorableKind>(
        &self,
        module_id: &str,
        plan: &NullifyPlan<K>,
    ) -> LayoutResult<u64> {
        if plan.entries.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(pg_error)?;

        let mut touched = 0;
        for entry in &plan.entries {
            let sql = nullify_update::<K>(entry.fields.iter().copied());
            touched += tx
                .execute(&sql, &[&module_id, &entry.value])
                .await
                .map_err(pg_error)?;
        }

        tx.commit().await.map_err(pg_error)?;
        Ok(touched)
    }

    async fn set_column_width(
        &self,
        module_id: &str,
        user_id: &str,
        value: &str,
        width: f64,
    ) -> LayoutResult<BatchOutcome> {
        let conn = self.get_conn().await?;

        let mut row = OverrideItem::<Column>::blank(new_item_id(), module_id, user_id, value);
        row.overrides.width = Some(width);
        let inserted = conn
            .query_one(&width_upsert(), &override_params(&row))
            .await
            .map_err(pg_error)?
            .try_get::<_, bool>(0)
            .map_err(pg_error)?;

        let mut outcome = BatchOutcome::default();
        if inserted {
            outcome.inserted = 1;
        } else {
            outcome.updated = 1;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custab_core::{ColumnField, Filter};
    use std::collections::HashMap;

    #[test]
    fn test_db_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("CUSTAB_DB_HOST", "db.internal"),
            ("CUSTAB_DB_PORT", "6543"),
            ("CUSTAB_DB_POOL_SIZE", "not-a-number"),
            ("CUSTAB_DB_TIMEOUT", "5"),
        ]
        .into_iter()
        .collect();
        let config = DbConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.dbname, "custab");
        assert_eq!(config.max_size, 16);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_baseline_sql_shapes() {
        assert_eq!(
            baseline_select::<Column>(),
            "SELECT id, module_id, value, name, fixed, seq, location, rule FROM baseline_columns \
             WHERE module_id = $1 ORDER BY ordinal"
        );
        assert_eq!(
            baseline_insert::<Filter>(),
            "INSERT INTO baseline_filters (id, module_id, value, name, fixed, seq) \
             VALUES ($1, $2, $3, $4, $5, $6)"
        );
        assert_eq!(
            baseline_update::<Column>(),
            "UPDATE baseline_columns SET value = $3, name = $4, fixed = $5, seq = $6, \
             location = $7, rule = $8 WHERE id = $1 AND module_id = $2"
        );
    }

    #[test]
    fn test_override_sql_shapes() {
        assert_eq!(
            override_update::<Column>(),
            "UPDATE override_columns SET hidden = $4, seq = $5, frozen = $6, location = $7, \
             rule = $8, width = $9 WHERE module_id = $1 AND user_id = $2 AND value = $3"
        );
        assert_eq!(
            override_row_upsert::<Filter>(),
            "INSERT INTO override_filters (id, module_id, user_id, value, hidden, seq) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (user_id, module_id, value) \
             DO UPDATE SET hidden = EXCLUDED.hidden, seq = EXCLUDED.seq RETURNING (xmax = 0)"
        );
        assert_eq!(
            width_upsert(),
            "INSERT INTO override_columns (id, module_id, user_id, value, hidden, seq, frozen, \
             location, rule, width) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (user_id, module_id, value) DO UPDATE SET width = EXCLUDED.width \
             RETURNING (xmax = 0)"
        );
        assert!(override_select::<Filter>(true).contains("user_id = $2"));
        assert!(!override_select::<Filter>(false).contains("user_id = $2"));
    }

    #[test]
    fn test_nullify_sql_uses_enum_names() {
        let sql = nullify_update::<Column>([ColumnField::Hidden, ColumnField::Width].into_iter());
        assert_eq!(
            sql,
            "UPDATE override_columns SET hidden = NULL, width = NULL WHERE module_id = $1 AND value = $2"
        );
    }

    #[test]
    fn test_schema_declares_every_table() {
        for table in [
            Column::BASELINE_TABLE,
            Column::OVERRIDE_TABLE,
            Filter::BASELINE_TABLE,
            Filter::OVERRIDE_TABLE,
        ] {
            assert!(SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", table)));
        }
    }
}
