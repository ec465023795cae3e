use async_trait::async_trait;
use chrono::Utc;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::MonitorError;
use crate::domain::ports::TableSource;
use crate::domain::snapshot::Snapshot;
use crate::domain::value_objects::MonitoredTable;
use crate::infrastructure::config::DbConfig;
use crate::infrastructure::db::dialect::{from_driver, Dialect};
use crate::infrastructure::db::row_mapper::row_to_record;
use crate::infrastructure::db::sql_utils::{build_capture_queries, CaptureQueries};

/// Upper bound on waiting for a pooled connection. Query execution itself is
/// bounded only by the driver's own timeouts.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SqlxTableSource {
    pool: AnyPool,
    dialect: Arc<dyn Dialect>,
    table: MonitoredTable,
    queries: CaptureQueries,
}

/// Build a `SqlxTableSource` for `cfg` without opening a connection yet.
///
/// The database may be down when the monitor starts; that surfaces as a
/// `Connection` error on the first capture instead of aborting startup.
pub fn connect_lazy(cfg: &DbConfig, table: MonitoredTable) -> Result<SqlxTableSource, MonitorError> {
    sqlx::any::install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_lazy(&cfg.url())
        .map_err(|e| {
            MonitorError::Configuration(format!(
                "invalid connection settings for {} (driver: {}): {}",
                cfg.dbname, cfg.driver, e
            ))
        })?;

    debug!(
        "Prepared pool for {}/{} via {} driver",
        cfg.host, cfg.dbname, cfg.driver
    );

    Ok(SqlxTableSource::from_pool(pool, Arc::from(from_driver(&cfg.driver)), table))
}

impl SqlxTableSource {
    pub fn from_pool(pool: AnyPool, dialect: Arc<dyn Dialect>, table: MonitoredTable) -> Self {
        let queries = build_capture_queries(&table, dialect.as_ref());
        Self {
            pool,
            dialect,
            table,
            queries,
        }
    }

    pub fn table(&self) -> &MonitoredTable {
        &self.table
    }
}

#[async_trait]
impl TableSource for SqlxTableSource {
    async fn capture(&self) -> Result<Snapshot, MonitorError> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            MonitorError::Connection(format!("cannot reach database for {}: {}", self.table, e))
        })?;

        let captured_at = Utc::now();

        debug!(dialect = self.dialect.name(), "Executing: {}", self.queries.count);
        let row_count: i64 = sqlx::query_scalar(&self.queries.count)
            .fetch_one(&mut *conn)
            .await?;
        let row_count = u64::try_from(row_count).map_err(|_| {
            MonitorError::DataSource(format!("negative row count {row_count} for {}", self.table))
        })?;

        debug!("Executing: {}", self.queries.projection);
        let rows = sqlx::query(&self.queries.projection)
            .fetch_all(&mut *conn)
            .await?;
        let records = rows
            .iter()
            .map(|row| row_to_record(row, &self.table))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Executing: {}", self.queries.max_key);
        let max_key: Option<i64> = sqlx::query_scalar(&self.queries.max_key)
            .fetch_one(&mut *conn)
            .await?;

        Ok(Snapshot {
            captured_at,
            row_count,
            max_key,
            records,
        })
    }
}
