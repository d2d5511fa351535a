//! Runs against a real server. Opt in with
//! `EXPENSES_TEST_ENGINE=postgres|mysql` plus the matching
//! `<ENGINE>_<DB_NAME>_*` credentials, then `cargo test -- --ignored`.

mod common;

use common::{date, expense};
use expense_tracker::db::{
    Database, Dialect, PoolSettings, SqlExecutor, SqlValue, Statement, database_factory,
};
use expense_tracker::middleware::RequestContext;
use expense_tracker::service::{ExpenseStore, SqlExpenseStore};
use expense_tracker::types::DateRange;
use rust_decimal::Decimal;
use uuid::Uuid;

async fn connect() -> Option<Database> {
    let _ = dotenvy::dotenv();
    let engine = std::env::var("EXPENSES_TEST_ENGINE").ok()?;
    let db_name = std::env::var("EXPENSES_TEST_DB_NAME").unwrap_or_else(|_| "local".to_string());
    let db = database_factory(&engine, &db_name, &PoolSettings::default())
        .await
        .expect("failed to connect to the test database");
    db.init_schema().await.expect("schema init failed");
    Some(db)
}

/// Scratch table private to one test run.
async fn scratch_table(db: &Database) -> String {
    let name = format!("it_{}", Uuid::new_v4().simple());
    let ddl = match db.dialect() {
        Dialect::Postgres => format!(
            "CREATE TABLE {name} (id BIGSERIAL PRIMARY KEY, code VARCHAR(32) UNIQUE NOT NULL, qty INTEGER NOT NULL)"
        ),
        Dialect::MySql => format!(
            "CREATE TABLE {name} (id BIGINT AUTO_INCREMENT PRIMARY KEY, code VARCHAR(32) UNIQUE NOT NULL, qty INT NOT NULL)"
        ),
    };
    db.execute(&ddl, &[]).await.expect("create scratch table");
    name
}

async fn drop_table(db: &Database, name: &str) {
    db.execute(&format!("DROP TABLE {name}"), &[])
        .await
        .expect("drop scratch table");
}

fn item(code: &str, qty: i64) -> Vec<SqlValue> {
    vec![code.into(), qty.into()]
}

#[tokio::test]
#[ignore = "needs a live database"]
async fn bulk_insert_pages_and_fetches_back() {
    let Some(db) = connect().await else { return };
    let table = scratch_table(&db).await;

    let rows: Vec<_> = (0..705).map(|i| item(&format!("c{i:04}"), i)).collect();
    let inserted = db
        .insert_bulk(&table, &rows, &["code", "qty"])
        .await
        .expect("bulk insert");
    assert_eq!(inserted, 705);

    let out = db
        .fetch(&format!("SELECT code, qty FROM {table} ORDER BY code"), &[])
        .await
        .expect("fetch");
    assert_eq!(out.columns, vec!["code".to_string(), "qty".to_string()]);
    assert_eq!(out.len(), 705);
    let first = out.records().next().expect("first row");
    assert_eq!(first.require("code").expect("code").as_str(), Some("c0000"));

    drop_table(&db, &table).await;
}

#[tokio::test]
#[ignore = "needs a live database"]
async fn empty_bulk_input_is_a_no_op() {
    let Some(db) = connect().await else { return };
    let table = scratch_table(&db).await;

    assert_eq!(db.insert_bulk(&table, &[], &["code", "qty"]).await.expect("insert"), 0);
    let out = db
        .fetch(&format!("SELECT code FROM {table}"), &[])
        .await
        .expect("fetch");
    assert!(out.is_empty());
    assert_eq!(out.columns, vec!["code".to_string()]);

    drop_table(&db, &table).await;
}

#[tokio::test]
#[ignore = "needs a live database"]
async fn upsert_bulk_updates_existing_keys() {
    let Some(db) = connect().await else { return };
    let table = scratch_table(&db).await;

    db.insert_bulk(&table, &[item("a", 1)], &["code", "qty"])
        .await
        .expect("seed");
    let sql = match db.dialect() {
        Dialect::Postgres => format!(
            "INSERT INTO {table} (code, qty) VALUES {{values}} ON CONFLICT (code) DO UPDATE SET qty = EXCLUDED.qty"
        ),
        Dialect::MySql => format!(
            "INSERT INTO {table} (code, qty) VALUES {{values}} ON DUPLICATE KEY UPDATE qty = VALUES(qty)"
        ),
    };
    db.upsert_bulk(&sql, &[item("a", 10), item("b", 2)])
        .await
        .expect("upsert");

    let out = db
        .fetch(&format!("SELECT code, qty FROM {table} ORDER BY code"), &[])
        .await
        .expect("fetch");
    let qty: Vec<_> = out
        .records()
        .map(|r| r.require("qty").expect("qty").clone())
        .collect();
    assert_eq!(qty, vec![SqlValue::Int(10), SqlValue::Int(2)]);

    drop_table(&db, &table).await;
}

#[tokio::test]
#[ignore = "needs a live database"]
async fn failed_batch_rolls_back_everything() {
    let Some(db) = connect().await else { return };
    let table = scratch_table(&db).await;
    let p = db.dialect().placeholder(1);
    let q = db.dialect().placeholder(2);

    let insert = format!("INSERT INTO {table} (code, qty) VALUES ({p}, {q})");
    let err = db
        .executemany(&insert, &[item("dup", 1), item("dup", 2)])
        .await;
    assert!(err.is_err(), "unique violation should fail the batch");

    let atomic = db
        .execute_atomic(vec![
            Statement::new(insert.clone(), item("x", 1)),
            Statement::new(format!("INSERT INTO {table} (nope) VALUES ({p})"), vec![1i64.into()]),
        ])
        .await;
    assert!(atomic.is_err());

    let out = db
        .fetch(&format!("SELECT code FROM {table}"), &[])
        .await
        .expect("fetch");
    assert!(out.is_empty(), "nothing from a failed scope may persist");

    drop_table(&db, &table).await;
}

#[tokio::test]
#[ignore = "needs a live database"]
async fn store_replaces_a_day_and_summarizes() {
    let Some(db) = connect().await else { return };
    let store = SqlExpenseStore::new(db);
    let ctx = RequestContext::new("live-test");
    // Far-future day nobody else writes to.
    let day = date("2199-01-01");

    store
        .replace_expenses(&ctx, day, &[expense("99", "stale", "")])
        .await
        .expect("first replace");
    let fresh = vec![
        expense("30.00", "food", "groceries"),
        expense("70.00", "transport", ""),
    ];
    store
        .replace_expenses(&ctx, day, &fresh)
        .await
        .expect("second replace");

    let fetched = store.expenses_for_date(&ctx, day).await.expect("fetch");
    assert_eq!(fetched, fresh);

    let totals = store
        .category_totals(
            &ctx,
            DateRange {
                start_date: day,
                end_date: day,
            },
        )
        .await
        .expect("totals");
    let food = totals
        .iter()
        .find(|t| t.category == "food")
        .expect("food total");
    assert_eq!(food.total, Decimal::from(30));

    store
        .replace_expenses(&ctx, day, &[])
        .await
        .expect("clear day");
    store.executor().close_all().await;
}

#[tokio::test]
#[ignore = "needs a live database"]
async fn close_all_is_idempotent() {
    let Some(db) = connect().await else { return };
    db.close_all().await;
    db.close_all().await;
    assert!(db.fetch("SELECT 1", &[]).await.is_err());
}

#[tokio::test]
#[ignore = "needs a live database"]
async fn nulls_bind_into_numeric_and_date_columns() {
    let Some(db) = connect().await else { return };
    let table = format!("it_{}", Uuid::new_v4().simple());
    db.execute(
        &format!("CREATE TABLE {table} (a NUMERIC(10, 2), d DATE, n INTEGER)"),
        &[],
    )
    .await
    .expect("create scratch table");

    let inserted = db
        .insert_bulk(
            &table,
            &[
                vec![SqlValue::Null, SqlValue::Null, SqlValue::Null],
                vec![
                    Decimal::new(1250, 2).into(),
                    date("2024-01-01").into(),
                    SqlValue::Null,
                ],
            ],
            &["a", "d", "n"],
        )
        .await
        .expect("nulls must bind to typed columns");
    assert_eq!(inserted, 2);

    let p = db.dialect().placeholder(1);
    let updated = db
        .execute(&format!("UPDATE {table} SET d = {p} WHERE a IS NOT NULL"), &[SqlValue::Null])
        .await
        .expect("null update");
    assert_eq!(updated, 1);

    let out = db
        .fetch(&format!("SELECT a, d FROM {table} WHERE d IS NULL ORDER BY a"), &[])
        .await
        .expect("fetch");
    assert_eq!(out.len(), 2);
    let amounts: Vec<Option<Decimal>> = out
        .records()
        .map(|r| r.require("a").expect("a").as_decimal())
        .collect();
    // NULLs sort first on MySQL and last on Postgres.
    assert!(amounts.contains(&None));
    assert!(amounts.contains(&Some(Decimal::new(1250, 2))));

    drop_table(&db, &table).await;
}
