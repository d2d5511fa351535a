use std::future::Future;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{
    PgArgumentBuffer, PgArguments, PgConnectOptions, PgConnection, PgRow, PgTypeInfo,
};
use sqlx::query::Query;
use sqlx::{Encode, Executor, Postgres, Row, Statement as _, Type, TypeInfo, ValueRef};

use crate::db::credentials::DbCredentials;
use crate::db::executor::{Driver, SqlxExecutor, column_names};
use crate::db::sql::Dialect;
use crate::db::value::{RowSet, SqlValue};

pub type PgExecutor = SqlxExecutor<Postgres>;

impl Driver for Postgres {
    const DIALECT: Dialect = Dialect::Postgres;
    const LABEL: &'static str = "postgres";

    fn connect_options(creds: &DbCredentials) -> PgConnectOptions {
        creds.pg_options()
    }

    fn execute_on<'a>(
        conn: &'a mut PgConnection,
        sql: &'a str,
        params: &'a [SqlValue],
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send + 'a {
        async move {
            let done = bind_all(sqlx::query(sql), params).execute(conn).await?;
            Ok(done.rows_affected())
        }
    }

    fn fetch_on<'a>(
        conn: &'a mut PgConnection,
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

/// NULL sent with type oid 0 so the server infers the parameter type from
/// context. A NULL typed as TEXT is rejected by NUMERIC, DATE and INT
/// columns.
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for value in params {
        query = match value.clone() {
            SqlValue::Null => query.bind(UntypedNull),
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

fn decode_row(row: &PgRow) -> Result<Vec<SqlValue>, sqlx::Error> {
    (0..row.len()).map(|idx| decode_cell(row, idx)).collect()
}

fn decode_cell(row: &PgRow, idx: usize) -> Result<SqlValue, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let type_name = raw.type_info().name().to_string();
    let value = match type_name.as_str() {
        "BOOL" => SqlValue::Bool(row.try_get(idx)?),
        "INT2" => SqlValue::Int(row.try_get::<i16, _>(idx)?.into()),
        "INT4" => SqlValue::Int(row.try_get::<i32, _>(idx)?.into()),
        "INT8" => SqlValue::Int(row.try_get(idx)?),
        "FLOAT4" => SqlValue::Float(row.try_get::<f32, _>(idx)?.into()),
        "FLOAT8" => SqlValue::Float(row.try_get(idx)?),
        "NUMERIC" => SqlValue::Decimal(row.try_get::<Decimal, _>(idx)?),
        "DATE" => SqlValue::Date(row.try_get::<NaiveDate, _>(idx)?),
        "TIMESTAMP" => SqlValue::Timestamp(row.try_get::<NaiveDateTime, _>(idx)?),
        "TIMESTAMPTZ" => SqlValue::Timestamp(row.try_get::<DateTime<Utc>, _>(idx)?.naive_utc()),
        _ => SqlValue::Text(row.try_get::<String, _>(idx)?),
    };
    Ok(value)
}
