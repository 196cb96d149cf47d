//! MySQL schema introspection.
//!
//! Table listing comes from `SHOW FULL TABLES`; column metadata from
//! `SHOW FULL COLUMNS`, whose `Key` flag drives primary/unique detection and
//! whose `Extra` field flags auto-increment columns. Foreign-key membership
//! is resolved through `information_schema.KEY_COLUMN_USAGE`.

use std::collections::HashSet;

use sqlx::{MySqlPool, Row as SqlxRow};

use super::types::quote_ident;
use crate::database::error::{DriverError, Result};
use crate::database::traits::ColumnDescriptor;

/// User table names of the current database in catalog order, views excluded.
pub(super) async fn table_names(pool: &MySqlPool) -> Result<Vec<String>> {
    let rows = sqlx::query("SHOW FULL TABLES").fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let table_type: String = row.get(1);
            (table_type == "BASE TABLE").then(|| row.get::<String, _>(0))
        })
        .collect())
}

/// Column metadata for one table.
pub(super) async fn table_columns(pool: &MySqlPool, table: &str) -> Result<Vec<ColumnDescriptor>> {
    let query = format!("SHOW FULL COLUMNS FROM {}", quote_ident(table));
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .await
        .map_err(|err| table_lookup_error(table, err))?;

    let foreign = foreign_key_columns(pool, table).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let name: String = row.get("Field");
            let data_type: String = row.get("Type");
            let nullable: String = row.get("Null");
            let key: String = row.get("Key");
            let default_value: Option<String> = row.get("Default");
            let extra: String = row.get("Extra");
            let comment: String = row.get("Comment");

            ColumnDescriptor {
                length: type_length(&data_type),
                comment: (!comment.is_empty()).then_some(comment),
                default_value,
                not_null: nullable == "NO",
                primary_key: key == "PRI",
                unique: key == "UNI",
                is_auto_increment: extra.to_lowercase().contains("auto_increment"),
                foreign_key: foreign.contains(&name),
                column_name: name,
                data_type,
            }
        })
        .collect())
}

/// Columns of the table that participate in a foreign-key constraint.
async fn foreign_key_columns(pool: &MySqlPool, table: &str) -> Result<HashSet<String>> {
    let rows = sqlx::query(
        r#"
        SELECT COLUMN_NAME
        FROM information_schema.KEY_COLUMN_USAGE
        WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_NAME = ?
            AND REFERENCED_TABLE_NAME IS NOT NULL
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.get("COLUMN_NAME")).collect())
}

/// Surface "unknown table" as a schema error rather than a generic query
/// failure.
fn table_lookup_error(table: &str, err: sqlx::Error) -> DriverError {
    match &err {
        sqlx::Error::Database(db) => {
            DriverError::Schema(format!("table '{}': {}", table, db.message()))
        }
        _ => err.into(),
    }
}

/// Extract the declared length from a MySQL column type such as
/// `varchar(255)`. Multi-argument types like `decimal(10,2)` report no
/// single length.
pub(super) fn type_length(data_type: &str) -> Option<i64> {
    let open = data_type.find('(')?;
    let close = data_type[open..].find(')')? + open;
    data_type[open + 1..close].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_length() {
        assert_eq!(type_length("varchar(255)"), Some(255));
        assert_eq!(type_length("int(11)"), Some(11));
        assert_eq!(type_length("char(1)"), Some(1));
        assert_eq!(type_length("decimal(10,2)"), None);
        assert_eq!(type_length("text"), None);
        assert_eq!(type_length("enum('a','b')"), None);
    }
}
