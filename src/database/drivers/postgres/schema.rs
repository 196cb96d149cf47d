//! PostgreSQL schema introspection.
//!
//! Table listing comes from `information_schema.tables`; column metadata
//! from one catalog join over `pg_attribute`, `pg_index` (primary/unique),
//! `pg_constraint` (foreign keys), and `pg_attrdef` (defaults).

use sqlx::{PgPool, Row as SqlxRow};

use crate::database::error::{DriverError, Result};
use crate::database::traits::ColumnDescriptor;

/// User table names of the public schema in catalog order.
pub(super) async fn table_names(pool: &PgPool) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        SELECT table_name
        FROM information_schema.tables
        WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.get("table_name")).collect())
}

const COLUMNS_SQL: &str = r#"
SELECT
    a.attname                               AS column_name,
    format_type(a.atttypid, a.atttypmod)    AS data_type,
    CASE WHEN a.atttypmod > 4 THEN a.atttypmod - 4 END AS length,
    col_description(a.attrelid, a.attnum)   AS comment,
    pg_get_expr(d.adbin, d.adrelid)         AS default_value,
    a.attnotnull                            AS not_null,
    EXISTS (
        SELECT 1 FROM pg_index i
        WHERE i.indrelid = a.attrelid
            AND a.attnum = ANY(i.indkey)
            AND i.indisprimary
    )                                       AS primary_key,
    EXISTS (
        SELECT 1 FROM pg_index i
        WHERE i.indrelid = a.attrelid
            AND a.attnum = ANY(i.indkey)
            AND i.indisunique
            AND NOT i.indisprimary
    )                                       AS is_unique,
    COALESCE(
        pg_get_expr(d.adbin, d.adrelid) LIKE 'nextval(%'
            OR a.attidentity IN ('a', 'd'),
        false
    )                                       AS is_auto_increment,
    EXISTS (
        SELECT 1 FROM pg_constraint c
        WHERE c.conrelid = a.attrelid
            AND c.contype = 'f'
            AND a.attnum = ANY(c.conkey)
    )                                       AS foreign_key
FROM pg_attribute a
JOIN pg_class t ON t.oid = a.attrelid
JOIN pg_namespace n ON n.oid = t.relnamespace
LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
WHERE n.nspname = 'public'
    AND t.relname = $1
    AND a.attnum > 0
    AND NOT a.attisdropped
ORDER BY a.attnum
"#;

/// Column metadata for one table of the public schema.
pub(super) async fn table_columns(pool: &PgPool, table: &str) -> Result<Vec<ColumnDescriptor>> {
    let rows = sqlx::query(COLUMNS_SQL)
        .bind(table)
        .fetch_all(pool)
        .await?;

    // Every live table has at least one attribute; an empty result means the
    // relation is missing.
    if rows.is_empty() {
        return Err(DriverError::Schema(format!(
            "table '{}' does not exist",
            table
        )));
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let length: Option<i32> = row.get("length");

            ColumnDescriptor {
                column_name: row.get("column_name"),
                data_type: row.get("data_type"),
                length: length.map(i64::from),
                comment: row.get("comment"),
                default_value: row.get("default_value"),
                not_null: row.get("not_null"),
                primary_key: row.get("primary_key"),
                unique: row.get("is_unique"),
                is_auto_increment: row.get("is_auto_increment"),
                foreign_key: row.get("foreign_key"),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_sql_shape() {
        // The catalog join binds exactly one parameter and filters to live,
        // user-visible attributes of the public schema.
        assert!(COLUMNS_SQL.contains("$1"));
        assert!(!COLUMNS_SQL.contains("$2"));
        assert!(COLUMNS_SQL.contains("a.attnum > 0"));
        assert!(COLUMNS_SQL.contains("NOT a.attisdropped"));
        assert!(COLUMNS_SQL.contains("nspname = 'public'"));
    }
}
