use std::future::Future;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::db::sql::{self, Statement};
use crate::db::{Database, SqlExecutor};
use crate::error::LedgerError;
use crate::middleware::request_context::RequestContext;
use crate::types::{CategoryTotal, DateRange, Expense};

pub const EXPENSES_TABLE: &str = "expenses";
pub const EXPENSE_COLUMNS: [&str; 4] = ["expense_date", "amount", "category", "notes"];

/// Domain queries the HTTP layer depends on.
pub trait ExpenseStore: Send + Sync + 'static {
    /// Every expense recorded on `date`, oldest first.
    fn expenses_for_date(
        &self,
        ctx: &RequestContext,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<Expense>, LedgerError>> + Send;

    /// Drop all expenses on `date` and store `expenses` instead, atomically.
    fn replace_expenses(
        &self,
        ctx: &RequestContext,
        date: NaiveDate,
        expenses: &[Expense],
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// Amount summed per category over the inclusive range.
    fn category_totals(
        &self,
        ctx: &RequestContext,
        range: DateRange,
    ) -> impl Future<Output = Result<Vec<CategoryTotal>, LedgerError>> + Send;
}

/// [`ExpenseStore`] over any SQL executor.
pub struct SqlExpenseStore<E = Database> {
    db: E,
    page_size: usize,
}

impl<E: SqlExecutor> SqlExpenseStore<E> {
    pub fn new(db: E) -> Self {
        Self { db, page_size: 300 }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn executor(&self) -> &E {
        &self.db
    }

    fn replace_statements(
        &self,
        date: NaiveDate,
        expenses: &[Expense],
    ) -> Result<Vec<Statement>, LedgerError> {
        let dialect = self.db.dialect();
        let rows: Vec<_> = expenses.iter().map(|e| e.to_row(date)).collect();

        let mut statements = vec![Statement::new(
            format!(
                "DELETE FROM {EXPENSES_TABLE} WHERE expense_date = {}",
                dialect.placeholder(1)
            ),
            vec![date.into()],
        )];
        statements.extend(sql::insert_statements(
            dialect,
            EXPENSES_TABLE,
            &EXPENSE_COLUMNS,
            &rows,
            self.page_size,
        )?);
        Ok(statements)
    }
}

impl<E: SqlExecutor + 'static> ExpenseStore for SqlExpenseStore<E> {
    async fn expenses_for_date(
        &self,
        ctx: &RequestContext,
        date: NaiveDate,
    ) -> Result<Vec<Expense>, LedgerError> {
        let sql = format!(
            "SELECT expense_date, amount, category, notes FROM {EXPENSES_TABLE} \
             WHERE expense_date = {} ORDER BY id",
            self.db.dialect().placeholder(1)
        );
        let rows = self.db.fetch(&sql, &[date.into()]).await?;
        debug!(
            request_id = %ctx.request_id,
            pipeline = ctx.pipeline,
            date = %date,
            rows = rows.len(),
            "expenses loaded"
        );
        rows.records().map(Expense::try_from).collect()
    }

    async fn replace_expenses(
        &self,
        ctx: &RequestContext,
        date: NaiveDate,
        expenses: &[Expense],
    ) -> Result<u64, LedgerError> {
        let statements = self.replace_statements(date, expenses)?;
        let affected = self.db.execute_atomic(statements).await?;
        info!(
            request_id = %ctx.request_id,
            pipeline = ctx.pipeline,
            date = %date,
            count = expenses.len(),
            affected,
            "expenses replaced"
        );
        Ok(affected)
    }

    async fn category_totals(
        &self,
        ctx: &RequestContext,
        range: DateRange,
    ) -> Result<Vec<CategoryTotal>, LedgerError> {
        let dialect = self.db.dialect();
        let sql = format!(
            "SELECT category, SUM(amount) AS total FROM {EXPENSES_TABLE} \
             WHERE expense_date BETWEEN {} AND {} \
             GROUP BY category ORDER BY category",
            dialect.placeholder(1),
            dialect.placeholder(2)
        );
        let rows = self
            .db
            .fetch(&sql, &[range.start_date.into(), range.end_date.into()])
            .await?;
        debug!(
            request_id = %ctx.request_id,
            pipeline = ctx.pipeline,
            start = %range.start_date,
            end = %range.end_date,
            categories = rows.len(),
            "category totals loaded"
        );
        rows.records().map(CategoryTotal::try_from).collect()
    }
}
