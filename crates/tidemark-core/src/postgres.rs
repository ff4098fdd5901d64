//! PostgreSQL backend: ledger storage and script execution.
//!
//! One [`PgBackend`] holds the connection pool for the duration of an
//! invocation. Connecting bootstraps idempotently: the target database is
//! created through the maintenance database when absent, then the
//! `_migrations` table and its unique timestamp index are created when
//! absent. Reads and writes only proceed once bootstrap has completed.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::{BoxError, ScriptRunner};
use crate::ledger::{Ledger, LedgerEntry};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::{Connection, PgConnection, Row};
use std::time::Duration;
use tracing::{debug, info};

/// Name of the bookkeeping table.
pub const LEDGER_TABLE: &str = "_migrations";

/// Maintenance database used to create the target database.
const MAINTENANCE_DB: &str = "postgres";

const BOOTSTRAP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS _migrations (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    "timestamp" TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS _migrations_timestamp_idx
    ON _migrations ("timestamp");
"#;

/// Shared connection pool plus the ledger and script-runner capabilities.
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    /// Connect to the configured database, bootstrapping it when needed.
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::ensure_database(config).await?;

        let options = connect_options(config).database(&config.db);
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.timeout))
            .connect_with(options)
            .await
            .map_err(persistence)?;

        let backend = Self { pool };
        backend.ensure_ledger().await?;
        Ok(backend)
    }

    /// Create the target database when it does not exist yet.
    async fn ensure_database(config: &Config) -> Result<()> {
        let options = connect_options(config).database(MAINTENANCE_DB);
        let mut conn = PgConnection::connect_with(&options)
            .await
            .map_err(persistence)?;

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM pg_database WHERE datname = $1")
                .bind(&config.db)
                .fetch_optional(&mut conn)
                .await
                .map_err(persistence)?;

        if exists.is_none() {
            info!(db = %config.db, "creating database");
            // CREATE DATABASE takes no bind parameters; the name is quoted
            // as an identifier instead.
            let create = format!("CREATE DATABASE {}", quote_ident(&config.db));
            sqlx::raw_sql(&create)
                .execute(&mut conn)
                .await
                .map_err(persistence)?;
        }

        conn.close().await.map_err(persistence)?;
        Ok(())
    }

    /// Create the ledger table and its unique timestamp index when absent.
    async fn ensure_ledger(&self) -> Result<()> {
        debug!(table = LEDGER_TABLE, "ensuring ledger table");
        sqlx::raw_sql(BOOTSTRAP_SQL)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(())
    }

    /// Drain the pool. Called on every exit path, success or failure.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Ledger for PgBackend {
    async fn list_applied(&self) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"SELECT id, name, "timestamp" FROM _migrations ORDER BY "timestamp" ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        rows.iter()
            .map(|row| {
                Ok(LedgerEntry {
                    id: row.try_get("id").map_err(persistence)?,
                    name: row.try_get("name").map_err(persistence)?,
                    timestamp: row.try_get("timestamp").map_err(persistence)?,
                })
            })
            .collect()
    }

    async fn record(&self, name: &str, timestamp: &str) -> Result<()> {
        sqlx::query(r#"INSERT INTO _migrations (name, "timestamp") VALUES ($1, $2)"#)
            .bind(name)
            .bind(timestamp)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(())
    }

    async fn erase(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM _migrations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(())
    }
}

#[async_trait]
impl ScriptRunner for PgBackend {
    async fn run_script(&self, sql: &str) -> std::result::Result<(), BoxError> {
        // raw_sql runs the whole section, which may hold several statements.
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }
}

fn connect_options(config: &Config) -> PgConnectOptions {
    let ssl_mode = if config.ssl {
        PgSslMode::Require
    } else {
        PgSslMode::Prefer
    };

    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .ssl_mode(ssl_mode)
        .application_name("tidemark")
}

fn persistence(e: sqlx::Error) -> Error {
    Error::Persistence {
        reason: e.to_string(),
    }
}

/// Quote a database name as a double-quoted identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("app"), "\"app\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_connect_options_reflect_config() {
        let config = Config::default()
            .with_host("db.internal")
            .with_port(6432)
            .with_user("deploy");
        let options = connect_options(&config);
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6432);
        assert_eq!(options.get_username(), "deploy");
    }
}
