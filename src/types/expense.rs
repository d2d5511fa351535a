use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::value::{Record, SqlValue};
use crate::error::LedgerError;

/// One expense as exchanged over HTTP; the date lives in the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub category: String,
    pub notes: String,
}

impl Expense {
    pub fn new(amount: Decimal, category: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            amount,
            category: category.into(),
            notes: notes.into(),
        }
    }

    /// Row values in `expense_date, amount, category, notes` order.
    pub fn to_row(&self, date: NaiveDate) -> Vec<SqlValue> {
        vec![
            date.into(),
            self.amount.into(),
            self.category.clone().into(),
            self.notes.clone().into(),
        ]
    }
}

/// Bounds of the `amount NUMERIC(10, 2)` and `category VARCHAR(255)` columns.
pub const AMOUNT_SCALE: u32 = 2;
pub const AMOUNT_LIMIT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);
pub const CATEGORY_MAX_CHARS: usize = 255;

/// Reject expenses the table would round, truncate or overflow. The error
/// names the first offending entry by position.
pub fn validate_expenses(expenses: &[Expense]) -> Result<(), LedgerError> {
    for (idx, e) in expenses.iter().enumerate() {
        let problem = if e.amount.normalize().scale() > AMOUNT_SCALE {
            format!("amount {} has more than {AMOUNT_SCALE} decimal places", e.amount)
        } else if e.amount.abs() >= AMOUNT_LIMIT {
            format!("amount {} must be below {AMOUNT_LIMIT} in magnitude", e.amount)
        } else if e.category.chars().count() > CATEGORY_MAX_CHARS {
            format!("category is longer than {CATEGORY_MAX_CHARS} characters")
        } else {
            continue;
        };
        return Err(LedgerError::InvalidExpense(format!("expense {idx}: {problem}")));
    }
    Ok(())
}

impl TryFrom<Record<'_>> for Expense {
    type Error = LedgerError;

    fn try_from(record: Record<'_>) -> Result<Self, Self::Error> {
        let amount = record
            .require("amount")?
            .as_decimal()
            .ok_or_else(|| LedgerError::RowShape("amount is not numeric".to_string()))?;
        let category = record
            .require("category")?
            .as_str()
            .ok_or_else(|| LedgerError::RowShape("category is not text".to_string()))?
            .to_string();
        // notes is nullable in the table
        let notes = match record.require("notes")? {
            SqlValue::Null => String::new(),
            other => other
                .as_str()
                .ok_or_else(|| LedgerError::RowShape("notes is not text".to_string()))?
                .to_string(),
        };
        Ok(Self {
            amount,
            category,
            notes,
        })
    }
}

/// Inclusive date range for analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Sum of amounts for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
}

impl TryFrom<Record<'_>> for CategoryTotal {
    type Error = LedgerError;

    fn try_from(record: Record<'_>) -> Result<Self, Self::Error> {
        let category = match record.require("category")? {
            SqlValue::Null => String::new(),
            other => other
                .as_str()
                .ok_or_else(|| LedgerError::RowShape("category is not text".to_string()))?
                .to_string(),
        };
        let total = match record.require("total")? {
            SqlValue::Null => Decimal::ZERO,
            other => other
                .as_decimal()
                .ok_or_else(|| LedgerError::RowShape("total is not numeric".to_string()))?,
        };
        Ok(Self { category, total })
    }
}

/// A category's share of the range total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::value::RowSet;
    use std::str::FromStr;

    #[test]
    fn expense_amount_is_a_json_number() {
        let e = Expense::new(Decimal::from_str("12.50").unwrap(), "food", "lunch");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["amount"], serde_json::json!(12.5));

        let back: Expense =
            serde_json::from_str(r#"{"amount": 12.5, "category": "food", "notes": "lunch"}"#)
                .unwrap();
        assert_eq!(back.amount, Decimal::from_str("12.5").unwrap());
    }

    #[test]
    fn amounts_must_fit_the_column() {
        let ok = |amount: &str| Expense::new(Decimal::from_str(amount).unwrap(), "food", "");

        assert!(validate_expenses(&[ok("12.50"), ok("0.01"), ok("-99999999.99")]).is_ok());
        // Trailing zeros do not count as precision.
        assert!(validate_expenses(&[ok("7.1000")]).is_ok());

        let err = validate_expenses(&[ok("1"), ok("12.345")]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidExpense(_)));
        assert!(err.to_string().contains("expense 1"), "{err}");

        assert!(validate_expenses(&[ok("100000000")]).is_err());
        assert!(validate_expenses(&[ok("-123456789")]).is_err());
    }

    #[test]
    fn json_amounts_keep_their_written_precision() {
        let e: Expense =
            serde_json::from_str(r#"{"amount": 30.01, "category": "food", "notes": ""}"#).unwrap();
        assert_eq!(e.amount, Decimal::from_str("30.01").unwrap());
        assert!(validate_expenses(&[e]).is_ok());
    }

    #[test]
    fn overlong_category_is_rejected() {
        let e = Expense::new(Decimal::ONE, "x".repeat(CATEGORY_MAX_CHARS + 1), "");
        assert!(validate_expenses(&[e]).is_err());
        let e = Expense::new(Decimal::ONE, "é".repeat(CATEGORY_MAX_CHARS), "");
        assert!(validate_expenses(&[e]).is_ok());
    }

    #[test]
    fn expense_from_row_tolerates_null_notes_and_extra_columns() {
        let rows = RowSet::new(
            vec![
                "expense_date".into(),
                "amount".into(),
                "category".into(),
                "notes".into(),
            ],
            vec![vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().into(),
                Decimal::from_str("12.50").unwrap().into(),
                "food".into(),
                SqlValue::Null,
            ]],
        );
        let expense = Expense::try_from(rows.records().next().unwrap()).unwrap();
        assert_eq!(expense.category, "food");
        assert_eq!(expense.notes, "");
    }

    #[test]
    fn to_row_matches_insert_column_order() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let row = Expense::new(Decimal::from(5), "coffee", "").to_row(date);
        assert_eq!(row[0], SqlValue::Date(date));
        assert_eq!(row[2], SqlValue::Text("coffee".into()));
    }
}
