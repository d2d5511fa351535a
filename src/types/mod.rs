pub mod expense;

pub use expense::{CategoryShare, CategoryTotal, DateRange, Expense, MessageResponse};
