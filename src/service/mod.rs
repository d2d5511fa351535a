pub mod analytics;
pub mod expense_store;

pub use analytics::category_breakdown;
pub use expense_store::{ExpenseStore, SqlExpenseStore};
