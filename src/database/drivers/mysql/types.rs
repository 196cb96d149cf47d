//! MySQL type conversion and binding utilities.

use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row as SqlxRow, TypeInfo, ValueRef};

use crate::database::traits::{Row, Value};

pub(super) type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

/// Quote an identifier for interpolation into MySQL SQL.
pub(super) fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Bind a unified `Value` as the next statement parameter.
pub(super) fn bind_value<'q>(query: MySqlQuery<'q>, value: &Value) -> MySqlQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int16(v) => query.bind(*v as i64),
        Value::Int32(v) => query.bind(*v as i64),
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
        // MySQL has no uuid type; CHAR(36) columns take the text form
        Value::Uuid(u) => query.bind(u.to_string()),
        Value::Json(j) => query.bind(j.clone()),
        Value::Other { display, .. } => query.bind(display.clone()),
    }
}

/// Convert a MySQL result row to the unified `Row` mapping.
pub(super) fn convert_row(mysql_row: &MySqlRow) -> Row {
    mysql_row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let value = extract_value(mysql_row, idx, col.type_info().name());
            (col.name().to_string(), value)
        })
        .collect()
}

/// Extract a value from a MySQL row at the given column index.
fn extract_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    // Check for NULL first
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Err(_) => return Value::Null,
        _ => {}
    }

    decode_by_type(row, index, type_name)
}

/// Decode a value based on its MySQL type name.
fn decode_by_type(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match type_name {
        // MySQL models booleans as TINYINT(1)
        "BOOLEAN" | "BOOL" => row
            .try_get::<bool, _>(index)
            .map(Value::Bool)
            .or_else(|_| row.try_get::<i8, _>(index).map(|v| Value::Bool(v != 0)))
            .unwrap_or(Value::Null),

        "TINYINT" => row
            .try_get::<i8, _>(index)
            .map(|v| Value::Int16(v as i16))
            .unwrap_or(Value::Null),

        "TINYINT UNSIGNED" => row
            .try_get::<u8, _>(index)
            .map(|v| Value::Int16(v as i16))
            .unwrap_or(Value::Null),

        "SMALLINT" => row
            .try_get::<i16, _>(index)
            .map(Value::Int16)
            .unwrap_or(Value::Null),

        "SMALLINT UNSIGNED" => row
            .try_get::<u16, _>(index)
            .map(|v| Value::Int32(v as i32))
            .unwrap_or(Value::Null),

        "MEDIUMINT" | "INT" | "INTEGER" => row
            .try_get::<i32, _>(index)
            .map(Value::Int32)
            .unwrap_or(Value::Null),

        "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "INTEGER UNSIGNED" => row
            .try_get::<u32, _>(index)
            .map(|v| Value::Int64(v as i64))
            .unwrap_or(Value::Null),

        "BIGINT" => row
            .try_get::<i64, _>(index)
            .map(Value::Int64)
            .unwrap_or(Value::Null),

        // Out of i64 range in the general case; keep the text form
        "BIGINT UNSIGNED" => row
            .try_get::<u64, _>(index)
            .map(|v| Value::Other {
                type_name: "BIGINT UNSIGNED".to_string(),
                display: v.to_string(),
            })
            .unwrap_or(Value::Null),

        "FLOAT" => row
            .try_get::<f32, _>(index)
            .map(Value::Float32)
            .unwrap_or(Value::Null),

        "DOUBLE" | "DOUBLE PRECISION" | "REAL" => row
            .try_get::<f64, _>(index)
            .map(Value::Float64)
            .unwrap_or(Value::Null),

        "DECIMAL" | "NEWDECIMAL" | "NUMERIC" => row
            .try_get::<rust_decimal::Decimal, _>(index)
            .map(Value::Decimal)
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(index)
            .map(Value::Date)
            .unwrap_or(Value::Null),

        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(index)
            .map(Value::Time)
            .unwrap_or(Value::Null),

        "DATETIME" => row
            .try_get::<chrono::NaiveDateTime, _>(index)
            .map(Value::DateTime)
            .unwrap_or(Value::Null),

        "TIMESTAMP" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(index)
            .map(Value::DateTimeTz)
            .unwrap_or(Value::Null),

        "YEAR" => row
            .try_get::<u16, _>(index)
            .map(|v| Value::Int32(v as i32))
            .unwrap_or(Value::Null),

        "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM"
        | "SET" => row
            .try_get::<String, _>(index)
            .map(Value::Text)
            .unwrap_or(Value::Null),

        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        "JSON" => row
            .try_get::<serde_json::Value, _>(index)
            .map(Value::Json)
            .unwrap_or(Value::Null),

        _ => decode_unknown(row, index, type_name),
    }
}

/// Decode an unknown type by trying the common paths.
fn decode_unknown(row: &MySqlRow, index: usize, type_name: &str) -> Value {
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
        assert_eq!(quote_ident("users"), "`users`");
        assert_eq!(quote_ident("select"), "`select`");
        assert_eq!(quote_ident("we`ird"), "`we``ird`");
    }
}
