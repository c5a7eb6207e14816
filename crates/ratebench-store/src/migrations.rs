//! Startup schema migrations.
//!
//! Migrations own the audit log and its sequence only. The rates table
//! itself belongs to ingestion, which drops and recreates it wholesale on
//! every build.

use duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: "0001_lookup_log",
    sql: r#"
CREATE SEQUENCE IF NOT EXISTS lookup_log_seq;

CREATE TABLE IF NOT EXISTS lookup_log (
    seq BIGINT NOT NULL DEFAULT nextval('lookup_log_seq'),
    ts TIMESTAMP,
    geozip BIGINT NOT NULL,
    code TEXT NOT NULL,
    modifier TEXT,
    product TEXT NOT NULL,
    match_type TEXT NOT NULL,
    success TINYINT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lookup_log_ts ON lookup_log(ts);
"#,
}];

pub fn apply_migrations(connection: &Connection) -> Result<(), duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;

        if applied == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                [migration.version],
            )?;
        }
    }

    Ok(())
}
