//! PostgreSQL type conversion and binding utilities.

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as SqlxRow, TypeInfo, ValueRef};

use crate::database::traits::{Row, Value};

pub(super) type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Quote an identifier for interpolation into PostgreSQL SQL.
pub(super) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Bind a unified `Value` as the next statement parameter.
pub(super) fn bind_value<'q>(query: PgQuery<'q>, value: &Value) -> PgQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int16(v) => query.bind(*v),
        Value::Int32(v) => query.bind(*v),
        Value::Int64(v) => query.bind(*v),
        Value::Float32(v) => query.bind(*v),
        Value::Float64(v) => query.bind(*v),
        Value::Text(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.clone()),
        Value::Date(d) => query.bind(*d),
        Value::Time(t) => query.bind(*t),
        Value::DateTime(dt) => query.bind(*dt),
        Value::DateTimeTz(dt) => query.bind(*dt),
        Value::Decimal(d) => query.bind(*d),
        Value::Uuid(u) => query.bind(*u),
        Value::Json(j) => query.bind(j.clone()),
        Value::Other { display, .. } => query.bind(display.clone()),
    }
}

/// Convert a PostgreSQL result row to the unified `Row` mapping.
pub(super) fn convert_row(pg_row: &PgRow) -> Row {
    pg_row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let value = extract_value(pg_row, idx, col.type_info().name());
            (col.name().to_string(), value)
        })
        .collect()
}

/// Extract a value from a PostgreSQL row at the given column index.
fn extract_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    // Check for NULL first
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Err(_) => return Value::Null,
        _ => {}
    }

    decode_by_type(row, index, type_name)
}

/// Decode a value based on its PostgreSQL type name.
fn decode_by_type(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => row
            .try_get::<bool, _>(index)
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" | "SMALLSERIAL" => row
            .try_get::<i16, _>(index)
            .map(Value::Int16)
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" | "SERIAL" => row
            .try_get::<i32, _>(index)
            .map(Value::Int32)
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" | "BIGSERIAL" => row
            .try_get::<i64, _>(index)
            .map(Value::Int64)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<f32, _>(index)
            .map(Value::Float32)
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<f64, _>(index)
            .map(Value::Float64)
            .unwrap_or(Value::Null),

        "NUMERIC" | "DECIMAL" => row
            .try_get::<rust_decimal::Decimal, _>(index)
            .map(Value::Decimal)
            .unwrap_or(Value::Null),

        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
            .try_get::<String, _>(index)
            .map(Value::Text)
            .unwrap_or(Value::Null),

        "BYTEA" => row
            .try_get::<Vec<u8>, _>(index)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(index)
            .map(Value::Date)
            .unwrap_or(Value::Null),

        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(index)
            .map(Value::Time)
            .unwrap_or(Value::Null),

        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(index)
            .map(Value::DateTime)
            .unwrap_or(Value::Null),

        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(index)
            .map(Value::DateTimeTz)
            .unwrap_or(Value::Null),

        "UUID" => row
            .try_get::<uuid::Uuid, _>(index)
            .map(Value::Uuid)
            .unwrap_or(Value::Null),

        "JSON" | "JSONB" => row
            .try_get::<serde_json::Value, _>(index)
            .map(Value::Json)
            .unwrap_or(Value::Null),

        _ => decode_unknown(row, index, type_name),
    }
}

/// Decode an unknown type by trying the common paths.
fn decode_unknown(row: &PgRow, index: usize, type_name: &str) -> Value {
    if let Ok(v) = row.try_get::<String, _>(index) {
        return Value::Text(v);
    }

    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Value::Int64(v);
    }

    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Value::Float64(v);
    }

    Value::Other {
        type_name: type_name.to_string(),
        display: "<unknown>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("User"), "\"User\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
