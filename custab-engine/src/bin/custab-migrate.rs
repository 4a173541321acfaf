//! CUSTAB Schema Migration
//!
//! Applies the layout tables to the database named by `CUSTAB_DB_*`.

use custab_core::LayoutResult;
use custab_engine::telemetry::{init_tracing, TelemetryConfig};
use custab_storage::{DbConfig, PgLayoutStore};

#[tokio::main]
async fn main() -> LayoutResult<()> {
    let telemetry_config = TelemetryConfig::from_env()?;
    init_tracing(&telemetry_config)?;

    let db_config = DbConfig::from_env();
    tracing::info!(
        host = %db_config.host,
        port = db_config.port,
        dbname = %db_config.dbname,
        "Applying layout schema"
    );

    let store = PgLayoutStore::from_config(&db_config)?;
    store.migrate().await?;

    tracing::info!(pool_size = store.pool_size(), "Migration complete");
    Ok(())
}
