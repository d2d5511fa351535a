#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::NaiveDate;
use expense_tracker::LedgerError;
use expense_tracker::middleware::RequestContext;
use expense_tracker::service::ExpenseStore;
use expense_tracker::types::{CategoryTotal, DateRange, Expense};
use rust_decimal::Decimal;

/// In-memory stand-in for the SQL store.
#[derive(Default)]
pub struct MemoryExpenseStore {
    days: Mutex<BTreeMap<NaiveDate, Vec<Expense>>>,
    seen_request_ids: Mutex<Vec<String>>,
    fail: bool,
}

impl MemoryExpenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails as if the database were down.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn seed(&self, date: NaiveDate, expenses: Vec<Expense>) {
        self.days.lock().unwrap().insert(date, expenses);
    }

    pub fn request_ids(&self) -> Vec<String> {
        self.seen_request_ids.lock().unwrap().clone()
    }

    fn check(&self, ctx: &RequestContext) -> Result<(), LedgerError> {
        self.seen_request_ids
            .lock()
            .unwrap()
            .push(ctx.request_id.clone());
        if self.fail {
            return Err(LedgerError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

impl ExpenseStore for MemoryExpenseStore {
    async fn expenses_for_date(
        &self,
        ctx: &RequestContext,
        date: NaiveDate,
    ) -> Result<Vec<Expense>, LedgerError> {
        self.check(ctx)?;
        Ok(self
            .days
            .lock()
            .unwrap()
            .get(&date)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_expenses(
        &self,
        ctx: &RequestContext,
        date: NaiveDate,
        expenses: &[Expense],
    ) -> Result<u64, LedgerError> {
        self.check(ctx)?;
        let mut days = self.days.lock().unwrap();
        let removed = days.remove(&date).map(|v| v.len()).unwrap_or(0);
        if !expenses.is_empty() {
            days.insert(date, expenses.to_vec());
        }
        Ok((removed + expenses.len()) as u64)
    }

    async fn category_totals(
        &self,
        ctx: &RequestContext,
        range: DateRange,
    ) -> Result<Vec<CategoryTotal>, LedgerError> {
        self.check(ctx)?;
        // BETWEEN with start > end matches nothing.
        if range.start_date > range.end_date {
            return Ok(Vec::new());
        }
        let days = self.days.lock().unwrap();
        let mut sums: BTreeMap<String, Decimal> = BTreeMap::new();
        for (_, expenses) in days.range(range.start_date..=range.end_date) {
            for e in expenses {
                *sums.entry(e.category.clone()).or_default() += e.amount;
            }
        }
        Ok(sums
            .into_iter()
            .map(|(category, total)| CategoryTotal { category, total })
            .collect())
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
}

pub fn expense(amount: &str, category: &str, notes: &str) -> Expense {
    Expense::new(amount.parse().expect("valid decimal"), category, notes)
}
