//! SQLite type conversion and binding utilities.
//!
//! SQLite uses dynamic typing with type affinity:
//! - INTEGER: 64-bit signed integer
//! - REAL: 64-bit floating point
//! - TEXT: UTF-8 string
//! - BLOB: Binary data
//! - NULL: Null value

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row as SqlxRow, Sqlite, TypeInfo, ValueRef};

use crate::database::traits::{Row, Value};

pub(super) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Quote an identifier for interpolation into SQLite SQL.
pub(super) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Bind a unified `Value` as the next statement parameter.
///
/// Types SQLite has no storage class for (decimal, uuid, json) are bound as
/// their text form.
pub(super) fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int16(v) => query.bind(*v as i64),
        Value::Int32(v) => query.bind(*v as i64),
        Value::Int64(v) => query.bind(*v),
        Value::Float32(v) => query.bind(*v as f64),
        Value::Float64(v) => query.bind(*v),
        Value::Text(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.clone()),
        Value::Date(d) => query.bind(*d),
        Value::Time(t) => query.bind(*t),
        Value::DateTime(dt) => query.bind(*dt),
        Value::DateTimeTz(dt) => query.bind(*dt),
        Value::Decimal(d) => query.bind(d.to_string()),
        Value::Uuid(u) => query.bind(u.to_string()),
        Value::Json(j) => query.bind(j.to_string()),
        Value::Other { display, .. } => query.bind(display.clone()),
    }
}

/// Convert a SQLite result row to the unified `Row` mapping.
pub(super) fn convert_row(sqlite_row: &SqliteRow) -> Row {
    sqlite_row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let value = extract_value(sqlite_row, idx, col.type_info().name());
            (col.name().to_string(), value)
        })
        .collect()
}

/// Extract a value from a SQLite row at the given column index.
fn extract_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    // Check for NULL first
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Err(_) => return Value::Null,
        _ => {}
    }

    decode_by_type(row, index, &type_name.to_uppercase())
}

/// Decode a value based on its SQLite type name, honoring affinity rules.
fn decode_by_type(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "INTEGER" | "INT" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "BIGINT" | "INT2"
        | "INT8" => row
            .try_get::<i64, _>(index)
            .map(Value::Int64)
            .unwrap_or(Value::Null),

        // SQLite stores booleans as 0/1 integers
        "BOOLEAN" | "BOOL" => row
            .try_get::<bool, _>(index)
            .map(Value::Bool)
            .or_else(|_| row.try_get::<i64, _>(index).map(|v| Value::Bool(v != 0)))
            .unwrap_or(Value::Null),

        "REAL" | "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" => row
            .try_get::<f64, _>(index)
            .map(Value::Float64)
            .unwrap_or(Value::Null),

        "TEXT" | "VARCHAR" | "NVARCHAR" | "NCHAR" | "CHARACTER" | "CHAR" | "CLOB" => row
            .try_get::<String, _>(index)
            .map(Value::Text)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        "DATE" => decode_date(row, index),
        "TIME" => decode_time(row, index),
        "DATETIME" | "TIMESTAMP" => decode_datetime(row, index),

        "NUMERIC" | "DECIMAL" => decode_numeric(row, index),

        _ => decode_unknown(row, index, type_name),
    }
}

/// Decode a DATE value (SQLite stores dates as ISO text).
fn decode_date(row: &SqliteRow, index: usize) -> Value {
    if let Ok(s) = row.try_get::<String, _>(index) {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            return Value::Date(date);
        }
        return Value::Text(s);
    }

    Value::Null
}

/// Decode a TIME value.
fn decode_time(row: &SqliteRow, index: usize) -> Value {
    if let Ok(s) = row.try_get::<String, _>(index) {
        if let Ok(time) = chrono::NaiveTime::parse_from_str(&s, "%H:%M:%S") {
            return Value::Time(time);
        }
        if let Ok(time) = chrono::NaiveTime::parse_from_str(&s, "%H:%M:%S%.f") {
            return Value::Time(time);
        }
        return Value::Text(s);
    }

    Value::Null
}

/// Decode a DATETIME value (ISO text or Unix timestamp).
fn decode_datetime(row: &SqliteRow, index: usize) -> Value {
    if let Ok(s) = row.try_get::<String, _>(index) {
        for format in [
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M:%S%.f",
        ] {
            if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(&s, format) {
                return Value::DateTime(dt);
            }
        }
        return Value::Text(s);
    }

    if let Ok(timestamp) = row.try_get::<i64, _>(index) {
        if let Some(dt) = chrono::DateTime::from_timestamp(timestamp, 0) {
            return Value::DateTimeTz(dt);
        }
    }

    Value::Null
}

/// Decode a NUMERIC/DECIMAL value (stored as TEXT, REAL, or INTEGER).
fn decode_numeric(row: &SqliteRow, index: usize) -> Value {
    if let Ok(s) = row.try_get::<String, _>(index) {
        if let Ok(decimal) = s.parse::<rust_decimal::Decimal>() {
            return Value::Decimal(decimal);
        }
        return Value::Text(s);
    }

    if let Ok(f) = row.try_get::<f64, _>(index) {
        return Value::Float64(f);
    }

    if let Ok(i) = row.try_get::<i64, _>(index) {
        return Value::Int64(i);
    }

    Value::Null
}

/// Decode an unknown type by trying the common storage classes.
fn decode_unknown(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Value::Int64(v);
    }

    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Value::Float64(v);
    }

    if let Ok(v) = row.try_get::<String, _>(index) {
        return Value::Text(v);
    }

    if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
        return Value::Bytes(v);
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
        assert_eq!(quote_ident("order"), "\"order\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
