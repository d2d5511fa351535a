//! Engine-independent executor. Transactions, paging and logging live here;
//! binding and decoding are supplied per engine through [`Driver`].

use std::future::Future;

use sqlx::{Connection, Pool};
use tracing::{debug, info};

use crate::db::SqlExecutor;
use crate::db::credentials::DbCredentials;
use crate::db::pool::{PoolSettings, ScopedPool};
use crate::db::sql::{self, Dialect, Statement};
use crate::db::value::{RowSet, SqlValue};
use crate::error::LedgerError;

/// The per-engine half of an executor.
pub trait Driver: sqlx::Database {
    const DIALECT: Dialect;
    const LABEL: &'static str;

    fn connect_options(creds: &DbCredentials) -> <Self::Connection as Connection>::Options;

    /// Run one statement on `conn`; returns the affected row count.
    fn execute_on<'a>(
        conn: &'a mut Self::Connection,
        sql: &'a str,
        params: &'a [SqlValue],
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send + 'a;

    /// Run one query on `conn`. Column names are reported even when no row
    /// matches.
    fn fetch_on<'a>(
        conn: &'a mut Self::Connection,
        sql: &'a str,
        params: &'a [SqlValue],
    ) -> impl Future<Output = Result<RowSet, sqlx::Error>> + Send + 'a;
}

pub struct SqlxExecutor<DB: Driver> {
    pool: ScopedPool<DB>,
    page_size: usize,
}

impl<DB: Driver> Clone for SqlxExecutor<DB> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            page_size: self.page_size,
        }
    }
}

impl<DB: Driver> SqlxExecutor<DB> {
    pub async fn connect(
        db_name: &str,
        creds: &DbCredentials,
        settings: &PoolSettings,
    ) -> Result<Self, LedgerError> {
        let pool = settings
            .pool_options::<DB>()
            .connect_with(DB::connect_options(creds))
            .await?;
        info!(
            engine = DB::LABEL,
            db_name,
            host = %creds.host,
            port = creds.port,
            max_connections = settings.max_connections,
            "connection pool ready"
        );
        Ok(Self::from_pool(db_name, pool, settings.bulk_page_size))
    }

    /// Wrap an existing pool, e.g. one built with `connect_lazy_with`.
    pub fn from_pool(db_name: &str, pool: Pool<DB>, page_size: usize) -> Self {
        Self {
            pool: ScopedPool::new(format!("{db_name}_pool"), pool),
            page_size: page_size.max(1),
        }
    }

    pub fn scoped_pool(&self) -> &ScopedPool<DB> {
        &self.pool
    }

    /// Every statement on one scoped connection; all commit or none do.
    async fn run_statements(&self, statements: &[Statement]) -> Result<u64, LedgerError> {
        if statements.is_empty() {
            return Ok(0);
        }
        let mut scope = self.pool.acquire().await?;
        let mut result = Ok(0);
        for stmt in statements {
            match DB::execute_on(scope.conn(), &stmt.sql, &stmt.params).await {
                Ok(n) => result = result.map(|total| total + n),
                Err(e) => {
                    result = Err(LedgerError::from(e));
                    break;
                }
            }
        }
        scope.finish(result).await
    }
}

impl<DB: Driver> SqlExecutor for SqlxExecutor<DB> {
    fn dialect(&self) -> Dialect {
        DB::DIALECT
    }

    async fn fetch(&self, sql: &str, params: &[SqlValue]) -> Result<RowSet, LedgerError> {
        let mut scope = self.pool.acquire().await?;
        let result = DB::fetch_on(scope.conn(), sql, params)
            .await
            .map_err(LedgerError::from);
        scope.finish(result).await
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, LedgerError> {
        let mut scope = self.pool.acquire().await?;
        let result = DB::execute_on(scope.conn(), sql, params)
            .await
            .map_err(LedgerError::from);
        scope.finish(result).await
    }

    async fn executemany(
        &self,
        sql: &str,
        params_list: &[Vec<SqlValue>],
    ) -> Result<u64, LedgerError> {
        let statements: Vec<Statement> = params_list
            .iter()
            .map(|params| Statement::new(sql, params.clone()))
            .collect();
        self.run_statements(&statements).await
    }

    async fn insert_bulk(
        &self,
        table: &str,
        rows: &[Vec<SqlValue>],
        columns: &[&str],
    ) -> Result<u64, LedgerError> {
        let statements = sql::insert_statements(DB::DIALECT, table, columns, rows, self.page_size)?;
        debug!(
            engine = DB::LABEL,
            table,
            rows = rows.len(),
            pages = statements.len(),
            "bulk insert"
        );
        self.run_statements(&statements).await
    }

    async fn upsert_bulk(&self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<u64, LedgerError> {
        let statements = sql::upsert_statements(DB::DIALECT, sql, rows, self.page_size)?;
        debug!(
            engine = DB::LABEL,
            rows = rows.len(),
            pages = statements.len(),
            "bulk upsert"
        );
        self.run_statements(&statements).await
    }

    async fn execute_atomic(&self, statements: Vec<Statement>) -> Result<u64, LedgerError> {
        self.run_statements(&statements).await
    }

    async fn close_all(&self) {
        self.pool.close().await;
    }
}

/// Column names in result-set order.
pub(crate) fn column_names<C: sqlx::Column>(columns: &[C]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}
