//! Bounded connection pool with transaction-scoped checkout.
//!
//! A [`ScopedConnection`] owns one pooled connection with an open
//! transaction. [`ScopedConnection::finish`] commits on `Ok` and rolls back
//! on `Err`; dropping the scope without finishing rolls back as well. In
//! every case the connection goes back to the pool.

use std::time::Duration;

use sqlx::pool::PoolOptions;
use sqlx::{Database, Pool, Transaction};
use tracing::{debug, warn};

use crate::error::LedgerError;

/// Pool bounds and bulk paging, validated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub bulk_page_size: usize,
}

impl PoolSettings {
    pub fn new(
        min_connections: u32,
        max_connections: u32,
        acquire_timeout: Duration,
        bulk_page_size: usize,
    ) -> Result<Self, LedgerError> {
        if max_connections == 0 {
            return Err(LedgerError::InvalidConfig(
                "DB_POOL_MAX must be at least 1".to_string(),
            ));
        }
        if min_connections > max_connections {
            return Err(LedgerError::InvalidConfig(format!(
                "DB_POOL_MIN ({min_connections}) exceeds DB_POOL_MAX ({max_connections})"
            )));
        }
        if bulk_page_size == 0 {
            return Err(LedgerError::InvalidConfig(
                "DB_BULK_PAGE_SIZE must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            min_connections,
            max_connections,
            acquire_timeout,
            bulk_page_size,
        })
    }

    pub(crate) fn pool_options<DB: Database>(&self) -> PoolOptions<DB> {
        PoolOptions::<DB>::new()
            .min_connections(self.min_connections)
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min_connections: 2,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
            bulk_page_size: 300,
        }
    }
}

pub struct ScopedPool<DB: Database> {
    name: String,
    pool: Pool<DB>,
}

impl<DB: Database> Clone for ScopedPool<DB> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            pool: self.pool.clone(),
        }
    }
}

impl<DB: Database> ScopedPool<DB> {
    pub fn new(name: impl Into<String>, pool: Pool<DB>) -> Self {
        Self {
            name: name.into(),
            pool,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> &Pool<DB> {
        &self.pool
    }

    /// Wait for a pooled connection (bounded by the acquire timeout) and
    /// open a transaction on it.
    pub async fn acquire(&self) -> Result<ScopedConnection<DB>, LedgerError> {
        let tx = self.pool.begin().await?;
        Ok(ScopedConnection {
            pool_name: self.name.clone(),
            tx,
        })
    }

    /// Close every pooled connection, waiting for checked-out ones to return.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!(pool = %self.name, "connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

pub struct ScopedConnection<DB: Database> {
    pool_name: String,
    tx: Transaction<'static, DB>,
}

impl<DB: Database> ScopedConnection<DB> {
    pub fn conn(&mut self) -> &mut DB::Connection {
        &mut self.tx
    }

    /// Commit when `result` is `Ok`, roll back when it is `Err`. The original
    /// error is returned even if the rollback itself fails.
    pub async fn finish<T>(self, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
        match result {
            Ok(value) => {
                self.tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.tx.rollback().await {
                    warn!(
                        pool = %self.pool_name,
                        error = %rollback_err,
                        "rollback failed after statement error"
                    );
                }
                Err(err)
            }
        }
    }
}
