use std::future::Future;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Executor, MySql, Row, Statement as _, TypeInfo, ValueRef};

use crate::db::credentials::DbCredentials;
use crate::db::executor::{Driver, SqlxExecutor, column_names};
use crate::db::sql::Dialect;
use crate::db::value::{RowSet, SqlValue};

pub type MySqlExecutor = SqlxExecutor<MySql>;

impl Driver for MySql {
    const DIALECT: Dialect = Dialect::MySql;
    const LABEL: &'static str = "mysql";

    fn connect_options(creds: &DbCredentials) -> MySqlConnectOptions {
        creds.mysql_options()
    }

    fn execute_on<'a>(
        conn: &'a mut MySqlConnection,
        sql: &'a str,
        params: &'a [SqlValue],
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send + 'a {
        async move {
            let done = bind_all(sqlx::query(sql), params).execute(conn).await?;
            Ok(done.rows_affected())
        }
    }

    fn fetch_on<'a>(
        conn: &'a mut MySqlConnection,
        sql: &'a str,
        params: &'a [SqlValue],
    ) -> impl Future<Output = Result<RowSet, sqlx::Error>> + Send + 'a {
        async move {
            let rows = bind_all(sqlx::query(sql), params)
                .fetch_all(&mut *conn)
                .await?;
            let columns = match rows.first() {
                Some(row) => column_names(row.columns()),
                None => column_names(conn.prepare(sql).await?.columns()),
            };
            let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;
            Ok(RowSet::new(columns, rows))
        }
    }
}

fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    for value in params {
        query = match value.clone() {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Int(v) => query.bind(v),
            SqlValue::Float(v) => query.bind(v),
            SqlValue::Decimal(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Timestamp(v) => query.bind(v),
        };
    }
    query
}

fn decode_row(row: &MySqlRow) -> Result<Vec<SqlValue>, sqlx::Error> {
    (0..row.len()).map(|idx| decode_cell(row, idx)).collect()
}

fn decode_cell(row: &MySqlRow, idx: usize) -> Result<SqlValue, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let type_name = raw.type_info().name().to_string();
    let value = match type_name.as_str() {
        "BOOLEAN" => SqlValue::Bool(row.try_get(idx)?),
        "TINYINT" => SqlValue::Int(row.try_get::<i8, _>(idx)?.into()),
        "SMALLINT" => SqlValue::Int(row.try_get::<i16, _>(idx)?.into()),
        "MEDIUMINT" | "INT" => SqlValue::Int(row.try_get::<i32, _>(idx)?.into()),
        "BIGINT" => SqlValue::Int(row.try_get(idx)?),
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => {
            let v: u64 = row.try_get(idx)?;
            SqlValue::Int(i64::try_from(v).map_err(|e| sqlx::Error::ColumnDecode {
                index: idx.to_string(),
                source: Box::new(e),
            })?)
        }
        "FLOAT" => SqlValue::Float(row.try_get::<f32, _>(idx)?.into()),
        "DOUBLE" => SqlValue::Float(row.try_get(idx)?),
        "DECIMAL" => SqlValue::Decimal(row.try_get::<Decimal, _>(idx)?),
        "DATE" => SqlValue::Date(row.try_get::<NaiveDate, _>(idx)?),
        "DATETIME" => SqlValue::Timestamp(row.try_get::<NaiveDateTime, _>(idx)?),
        "TIMESTAMP" => SqlValue::Timestamp(row.try_get::<DateTime<Utc>, _>(idx)?.naive_utc()),
        _ => SqlValue::Text(row.try_get::<String, _>(idx)?),
    };
    Ok(value)
}
