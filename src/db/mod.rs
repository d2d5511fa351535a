//! Data access layer: pooled, transaction-scoped SQL over PostgreSQL or MySQL.
//!
//! Layout:
//! - `credentials.rs`: `{ENGINE}_{DBNAME}_*` environment lookup
//! - `pool.rs`: bounded pool with commit/rollback scoped checkout
//! - `sql.rs`: placeholder rendering and multi-row statement building
//! - `value.rs`: engine-neutral cell values and row sets
//! - `executor.rs`: one executor generic over the engine `Driver`
//! - `postgres.rs` / `mysql.rs`: per-engine binding and decoding
//! - `schema.rs`: DDL for the `expenses` table

pub mod credentials;
pub mod executor;
pub mod mysql;
pub mod pool;
pub mod postgres;
pub mod schema;
pub mod sql;
pub mod value;

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use tracing::info;

pub use credentials::DbCredentials;
pub use executor::{Driver, SqlxExecutor};
pub use mysql::MySqlExecutor;
pub use pool::{PoolSettings, ScopedConnection, ScopedPool};
pub use postgres::PgExecutor;
pub use sql::{Dialect, Statement, VALUES_MARKER};
pub use value::{Record, RowSet, SqlValue};

use crate::error::LedgerError;

/// Supported relational engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Postgres,
    MySql,
}

impl Engine {
    /// Prefix of the credential environment variables.
    pub fn env_prefix(self) -> &'static str {
        match self {
            Engine::Postgres => "POSTGRES",
            Engine::MySql => "MYSQL",
        }
    }

    pub fn dialect(self) -> Dialect {
        match self {
            Engine::Postgres => Dialect::Postgres,
            Engine::MySql => Dialect::MySql,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Postgres => f.write_str("postgres"),
            Engine::MySql => f.write_str("mysql"),
        }
    }
}

impl FromStr for Engine {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Engine::Postgres),
            "mysql" => Ok(Engine::MySql),
            _ => Err(LedgerError::UnsupportedEngine(s.to_string())),
        }
    }
}

/// What every engine executor can do. Each call runs inside its own scoped
/// transaction.
pub trait SqlExecutor: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Rows and column names of a parameterized query, in result-set order.
    fn fetch(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl Future<Output = Result<RowSet, LedgerError>> + Send;

    /// Affected row count of one parameterized statement.
    fn execute(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// Run `sql` once per parameter set; the counts are summed.
    fn executemany(
        &self,
        sql: &str,
        params_list: &[Vec<SqlValue>],
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// Multi-row insert. Empty `rows` is a no-op.
    fn insert_bulk(
        &self,
        table: &str,
        rows: &[Vec<SqlValue>],
        columns: &[&str],
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// `sql` must contain [`VALUES_MARKER`]. Empty `rows` is a no-op.
    fn upsert_bulk(
        &self,
        sql: &str,
        rows: &[Vec<SqlValue>],
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// Several statements, all committed or all rolled back.
    fn execute_atomic(
        &self,
        statements: Vec<Statement>,
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    fn close_all(&self) -> impl Future<Output = ()> + Send;
}

/// A connected executor for one of the supported engines.
#[derive(Clone)]
pub enum Database {
    Postgres(PgExecutor),
    MySql(MySqlExecutor),
}

impl Database {
    pub async fn connect(
        engine: Engine,
        db_name: &str,
        creds: &DbCredentials,
        settings: &PoolSettings,
    ) -> Result<Self, LedgerError> {
        match engine {
            Engine::Postgres => Ok(Database::Postgres(
                PgExecutor::connect(db_name, creds, settings).await?,
            )),
            Engine::MySql => Ok(Database::MySql(
                MySqlExecutor::connect(db_name, creds, settings).await?,
            )),
        }
    }

    pub fn engine(&self) -> Engine {
        match self {
            Database::Postgres(_) => Engine::Postgres,
            Database::MySql(_) => Engine::MySql,
        }
    }

    /// Create the `expenses` table and index when missing.
    pub async fn init_schema(&self) -> Result<(), LedgerError> {
        let statements = schema::init_statements(self.dialect());
        self.execute_atomic(statements).await?;
        info!(engine = %self.engine(), "expenses schema ensured");
        Ok(())
    }
}

impl SqlExecutor for Database {
    fn dialect(&self) -> Dialect {
        self.engine().dialect()
    }

    async fn fetch(&self, sql: &str, params: &[SqlValue]) -> Result<RowSet, LedgerError> {
        match self {
            Database::Postgres(db) => db.fetch(sql, params).await,
            Database::MySql(db) => db.fetch(sql, params).await,
        }
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, LedgerError> {
        match self {
            Database::Postgres(db) => db.execute(sql, params).await,
            Database::MySql(db) => db.execute(sql, params).await,
        }
    }

    async fn executemany(
        &self,
        sql: &str,
        params_list: &[Vec<SqlValue>],
    ) -> Result<u64, LedgerError> {
        match self {
            Database::Postgres(db) => db.executemany(sql, params_list).await,
            Database::MySql(db) => db.executemany(sql, params_list).await,
        }
    }

    async fn insert_bulk(
        &self,
        table: &str,
        rows: &[Vec<SqlValue>],
        columns: &[&str],
    ) -> Result<u64, LedgerError> {
        match self {
            Database::Postgres(db) => db.insert_bulk(table, rows, columns).await,
            Database::MySql(db) => db.insert_bulk(table, rows, columns).await,
        }
    }

    async fn upsert_bulk(&self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<u64, LedgerError> {
        match self {
            Database::Postgres(db) => db.upsert_bulk(sql, rows).await,
            Database::MySql(db) => db.upsert_bulk(sql, rows).await,
        }
    }

    async fn execute_atomic(&self, statements: Vec<Statement>) -> Result<u64, LedgerError> {
        match self {
            Database::Postgres(db) => db.execute_atomic(statements).await,
            Database::MySql(db) => db.execute_atomic(statements).await,
        }
    }

    async fn close_all(&self) {
        match self {
            Database::Postgres(db) => db.close_all().await,
            Database::MySql(db) => db.close_all().await,
        }
    }
}

/// Build the executor for `engine` bound to the logical database `db_name`,
/// with credentials taken from the environment.
pub async fn database_factory(
    engine: &str,
    db_name: &str,
    settings: &PoolSettings,
) -> Result<Database, LedgerError> {
    let engine: Engine = engine.parse()?;
    let creds = DbCredentials::from_env(engine, db_name)?;
    Database::connect(engine, db_name, &creds, settings).await
}
