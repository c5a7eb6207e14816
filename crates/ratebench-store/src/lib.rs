//! DuckDB-backed rate store for ratebench.
//!
//! Owns the `allowed_amounts` table (rebuilt wholesale by ingestion), the
//! exact-match lookup queries behind the [`RateStore`] contract, and the
//! append-only `lookup_log` audit table. Schema migration for the audit log
//! runs once when a store handle is opened, never per request.

pub mod migrations;
pub mod pool;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use duckdb::ToSql;

use ratebench_core::{LookupLogEntry, MatchType, Percentiles, RateRow, RateStore, StoreError};

pub use pool::{AccessMode, ConnectionPool, PooledConnection};

const RATE_COLUMNS: &str = r#"geozip, code, modifier, product, description,
    "50th", "60th", "70th", "75th", "80th", "85th", "90th", "95th", source_file"#;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let home = resolve_ratebench_home();
        Self {
            db_path: home.join("data").join("allowed_amounts.duckdb"),
            max_pool_size: 4,
        }
    }
}

impl StoreConfig {
    pub fn at(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }
}

/// Handle to one DuckDB rate database.
#[derive(Debug, Clone)]
pub struct Store {
    pool: ConnectionPool,
}

impl Store {
    /// Open an existing database for serving. Fails with
    /// [`StoreError::Unavailable`] when the file is missing, which callers
    /// surface as a server-configuration failure.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        if !config.db_path.exists() {
            return Err(StoreError::Unavailable(format!(
                "allowed amounts database not found at {}; the data build may not have run",
                config.db_path.display()
            )));
        }
        Self::attach(config)
    }

    /// Create (or reuse) a database for an ingestion run.
    pub fn create(config: StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|error| StoreError::Unavailable(error.to_string()))?;
        }
        Self::attach(config)
    }

    fn attach(config: StoreConfig) -> Result<Self, StoreError> {
        let store = Self {
            pool: ConnectionPool::new(config.db_path, config.max_pool_size),
        };
        let connection = store
            .pool
            .acquire(AccessMode::ReadWrite)
            .map_err(db_error)?;
        migrations::apply_migrations(&connection).map_err(db_error)?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }

    /// Replace the entire rates table with `rows` in one transaction and
    /// rebuild the lookup indexes. Each ingestion run defines the full
    /// current state; there is no incremental mutation.
    pub fn replace_rates(&self, rows: &[RateRow]) -> Result<usize, StoreError> {
        let connection = self
            .pool
            .acquire(AccessMode::ReadWrite)
            .map_err(db_error)?;

        connection.execute_batch("BEGIN TRANSACTION").map_err(db_error)?;
        let result = (|| -> Result<usize, StoreError> {
            connection
                .execute_batch(
                    r#"
DROP TABLE IF EXISTS allowed_amounts;
CREATE TABLE allowed_amounts (
    geozip BIGINT NOT NULL,
    code TEXT NOT NULL,
    modifier TEXT,
    product TEXT NOT NULL,
    description TEXT NOT NULL,
    "50th" DOUBLE,
    "60th" DOUBLE,
    "70th" DOUBLE,
    "75th" DOUBLE,
    "80th" DOUBLE,
    "85th" DOUBLE,
    "90th" DOUBLE,
    "95th" DOUBLE,
    source_file TEXT NOT NULL
);
"#,
                )
                .map_err(db_error)?;

            let insert = format!(
                "INSERT INTO allowed_amounts ({RATE_COLUMNS}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            );
            let mut statement = connection.prepare(&insert).map_err(db_error)?;
            for row in rows {
                let percentiles = &row.percentiles;
                statement
                    .execute(duckdb::params![
                        row.geozip,
                        row.code,
                        row.modifier,
                        row.product,
                        row.description,
                        percentiles.p50,
                        percentiles.p60,
                        percentiles.p70,
                        percentiles.p75,
                        percentiles.p80,
                        percentiles.p85,
                        percentiles.p90,
                        percentiles.p95,
                        row.source_file,
                    ])
                    .map_err(db_error)?;
            }

            connection
                .execute_batch(
                    r#"
CREATE INDEX idx_allowed_lookup ON allowed_amounts (geozip, code, modifier);
CREATE INDEX idx_allowed_product ON allowed_amounts (product);
"#,
                )
                .map_err(db_error)?;

            Ok(rows.len())
        })();

        finalize_transaction(&connection, result)
    }

    /// Append audit entries in order. Entries are never updated or read back
    /// on the request path.
    pub fn append_log(&self, entries: &[LookupLogEntry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }

        let connection = self
            .pool
            .acquire(AccessMode::ReadWrite)
            .map_err(db_error)?;

        connection.execute_batch("BEGIN TRANSACTION").map_err(db_error)?;
        let result = (|| -> Result<(), StoreError> {
            let mut statement = connection
                .prepare(
                    "INSERT INTO lookup_log (ts, geozip, code, modifier, product, match_type, success) \
                     VALUES (TRY_CAST(? AS TIMESTAMP), ?, ?, ?, ?, ?, ?)",
                )
                .map_err(db_error)?;
            for entry in entries {
                statement
                    .execute(duckdb::params![
                        entry.ts,
                        entry.geozip,
                        entry.code,
                        entry.modifier,
                        entry.product,
                        entry.match_type.as_str(),
                        i32::from(entry.success),
                    ])
                    .map_err(db_error)?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    pub fn rate_count(&self) -> Result<i64, StoreError> {
        let connection = self.pool.acquire(AccessMode::ReadOnly).map_err(db_error)?;
        connection
            .query_row("SELECT COUNT(*) FROM allowed_amounts", [], |row| row.get(0))
            .map_err(db_error)
    }

    /// Audit entries in append order, for diagnostics and tests.
    pub fn log_entries(&self) -> Result<Vec<LookupLogEntry>, StoreError> {
        let connection = self.pool.acquire(AccessMode::ReadOnly).map_err(db_error)?;
        let mut statement = connection
            .prepare(
                "SELECT CAST(ts AS VARCHAR), geozip, code, modifier, product, match_type, success \
                 FROM lookup_log ORDER BY seq",
            )
            .map_err(db_error)?;

        let rows = statement
            .query_map([], |row| {
                let match_type: String = row.get(5)?;
                let success: i32 = row.get(6)?;
                Ok(LookupLogEntry {
                    ts: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    geozip: row.get(1)?,
                    code: row.get(2)?,
                    modifier: row.get(3)?,
                    product: row.get(4)?,
                    match_type: MatchType::from_wire(&match_type)
                        .unwrap_or(MatchType::NoMatch),
                    success: success != 0,
                })
            })
            .map_err(db_error)?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry.map_err(db_error)?);
        }
        Ok(entries)
    }

    fn fetch_rates(
        &self,
        where_clause: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<RateRow>, StoreError> {
        let connection = self.pool.acquire(AccessMode::ReadOnly).map_err(db_error)?;
        let sql = format!("SELECT {RATE_COLUMNS} FROM allowed_amounts WHERE {where_clause}");
        let mut statement = connection.prepare(&sql).map_err(db_error)?;
        let rows = statement.query_map(params, row_to_rate).map_err(db_error)?;

        let mut output = Vec::new();
        for row in rows {
            output.push(row.map_err(db_error)?);
        }
        Ok(output)
    }
}

impl RateStore for Store {
    fn modifier_rates(
        &self,
        geozip: i64,
        code: &str,
        modifier: &str,
        product_filter: Option<&str>,
    ) -> Result<Vec<RateRow>, StoreError> {
        match product_filter {
            Some(product) => self.fetch_rates(
                "geozip = ? AND code = ? AND modifier = ? AND product = ?",
                &[&geozip, &code, &modifier, &product],
            ),
            None => self.fetch_rates(
                "geozip = ? AND code = ? AND modifier = ?",
                &[&geozip, &code, &modifier],
            ),
        }
    }

    fn base_rates(
        &self,
        geozip: i64,
        code: &str,
        product_filter: Option<&str>,
    ) -> Result<Vec<RateRow>, StoreError> {
        match product_filter {
            Some(product) => self.fetch_rates(
                "geozip = ? AND code = ? AND (modifier IS NULL OR modifier = '') AND product = ?",
                &[&geozip, &code, &product],
            ),
            None => self.fetch_rates(
                "geozip = ? AND code = ? AND (modifier IS NULL OR modifier = '')",
                &[&geozip, &code],
            ),
        }
    }
}

fn row_to_rate(row: &duckdb::Row<'_>) -> Result<RateRow, duckdb::Error> {
    Ok(RateRow {
        geozip: row.get(0)?,
        code: row.get(1)?,
        modifier: row.get(2)?,
        product: row.get(3)?,
        description: row.get(4)?,
        percentiles: Percentiles {
            p50: row.get(5)?,
            p60: row.get(6)?,
            p70: row.get(7)?,
            p75: row.get(8)?,
            p80: row.get(9)?,
            p85: row.get(10)?,
            p90: row.get(11)?,
            p95: row.get(12)?,
        },
        source_file: row.get(13)?,
    })
}

fn finalize_transaction<T>(
    connection: &duckdb::Connection,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT").map_err(db_error)?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn db_error(error: duckdb::Error) -> StoreError {
    StoreError::Query(error.to_string())
}

fn resolve_ratebench_home() -> PathBuf {
    if let Some(path) = env::var_os("RATEBENCH_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".ratebench");
    }

    PathBuf::from(".ratebench")
}
