pub mod client;

pub use client::ExpenseApiClient;
