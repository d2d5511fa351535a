//! SQL DDL for the `expenses` table, one flavour per engine.
//!
//! `id` is internal ordering only and never leaves the store.

use crate::db::sql::{Dialect, Statement};

pub const POSTGRES_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS expenses (
    id BIGSERIAL PRIMARY KEY,
    expense_date DATE NOT NULL,
    amount NUMERIC(10, 2) NOT NULL,
    category VARCHAR(255) NOT NULL,
    notes TEXT NULL
);

CREATE INDEX IF NOT EXISTS idx_expenses_expense_date ON expenses(expense_date);
"#;

// MySQL has no `CREATE INDEX IF NOT EXISTS`, so the index lives in the table body.
pub const MYSQL_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS expenses (
    id BIGINT AUTO_INCREMENT PRIMARY KEY,
    expense_date DATE NOT NULL,
    amount DECIMAL(10, 2) NOT NULL,
    category VARCHAR(255) NOT NULL,
    notes TEXT NULL,
    INDEX idx_expenses_expense_date (expense_date)
);
"#;

/// DDL split into single statements (drivers won't take several at once).
pub fn init_statements(dialect: Dialect) -> Vec<Statement> {
    let ddl = match dialect {
        Dialect::Postgres => POSTGRES_INIT,
        Dialect::MySql => MYSQL_INIT,
    };
    ddl.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Statement::new(s, Vec::new()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_ddl_has_table_and_index() {
        let stmts = init_statements(Dialect::Postgres);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].sql.starts_with("CREATE TABLE IF NOT EXISTS expenses"));
        assert!(stmts[1].sql.starts_with("CREATE INDEX IF NOT EXISTS"));
    }

    #[test]
    fn mysql_ddl_is_a_single_statement() {
        let stmts = init_statements(Dialect::MySql);
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].sql.contains("AUTO_INCREMENT"));
        assert!(stmts.iter().all(|s| s.params.is_empty()));
    }
}
