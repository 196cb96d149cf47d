//! SQLite schema introspection.
//!
//! Table listing comes from `sqlite_master`; column metadata from
//! `PRAGMA table_info`, with unique and foreign-key flags filled in from
//! `PRAGMA index_list` / `PRAGMA foreign_key_list`.

use std::collections::HashSet;

use sqlx::{Row as SqlxRow, SqlitePool};

use crate::database::error::{DriverError, Result};
use crate::database::traits::ColumnDescriptor;

/// User table names in catalog order, excluding SQLite's internal tables.
pub(super) async fn table_names(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.get("name")).collect())
}

/// Column metadata for one table.
///
/// Primary-key membership comes from the pragma's key-rank column (non-zero
/// means part of the key). Auto-increment requires an integer primary key
/// carrying the literal `AUTOINCREMENT` default marker.
pub(super) async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<ColumnDescriptor>> {
    let escaped = table.replace('\'', "''");

    let query = format!("PRAGMA table_info('{}')", escaped);
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    // A table always has at least one column, so an empty pragma result
    // means the table itself is missing.
    if rows.is_empty() {
        return Err(DriverError::Schema(format!(
            "table '{}' does not exist",
            table
        )));
    }

    let unique = unique_columns(pool, &escaped).await?;
    let foreign = foreign_key_columns(pool, &escaped).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let name: String = row.get("name");
            let data_type: String = row.get("type");
            let notnull: i32 = row.get("notnull");
            let default_value: Option<String> = row.get("dflt_value");
            let pk: i32 = row.get("pk");

            let primary_key = pk > 0;
            let is_auto_increment = primary_key
                && data_type == "INTEGER"
                && default_value.as_deref() == Some("AUTOINCREMENT");

            ColumnDescriptor {
                unique: unique.contains(&name),
                foreign_key: foreign.contains(&name),
                column_name: name,
                data_type,
                length: None,
                comment: None,
                default_value,
                not_null: notnull != 0,
                primary_key,
                is_auto_increment,
            }
        })
        .collect())
}

/// Columns covered by a single-column unique index (origin 'u' in
/// `PRAGMA index_list`; primary-key indexes are reported separately).
async fn unique_columns(pool: &SqlitePool, table_escaped: &str) -> Result<HashSet<String>> {
    let query = format!("PRAGMA index_list('{}')", table_escaped);
    let index_rows = sqlx::query(&query).fetch_all(pool).await?;

    let mut columns = HashSet::new();

    for index_row in index_rows {
        let index_name: String = index_row.get("name");
        let is_unique: i32 = index_row.get("unique");
        let origin: String = index_row.get("origin");

        if is_unique == 0 || origin != "u" {
            continue;
        }

        let col_query = format!("PRAGMA index_info('{}')", index_name.replace('\'', "''"));
        let col_rows = sqlx::query(&col_query).fetch_all(pool).await?;

        if col_rows.len() == 1 {
            columns.insert(col_rows[0].get("name"));
        }
    }

    Ok(columns)
}

/// Columns participating in an outgoing foreign-key constraint.
async fn foreign_key_columns(pool: &SqlitePool, table_escaped: &str) -> Result<HashSet<String>> {
    let query = format!("PRAGMA foreign_key_list('{}')", table_escaped);
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    Ok(rows.into_iter().map(|row| row.get("from")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    async fn memory_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str(":memory:")
            .unwrap()
            .foreign_keys(true);

        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap()
    }

    #[test]
    fn test_table_names_excludes_internal() {
        smol::block_on(async {
            let pool = memory_pool().await;
            sqlx::query("CREATE TABLE books (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT)")
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query("CREATE TABLE authors (id INTEGER PRIMARY KEY)")
                .execute(&pool)
                .await
                .unwrap();

            let tables = table_names(&pool).await.unwrap();
            assert_eq!(tables, vec!["books".to_string(), "authors".to_string()]);
            // AUTOINCREMENT creates sqlite_sequence, which must stay hidden
            assert!(!tables.iter().any(|t| t.starts_with("sqlite_")));
        });
    }

    #[test]
    fn test_table_columns_flags() {
        smol::block_on(async {
            let pool = memory_pool().await;
            sqlx::query(
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY,
                    email TEXT NOT NULL UNIQUE,
                    bio TEXT DEFAULT 'none'
                )",
            )
            .execute(&pool)
            .await
            .unwrap();

            let columns = table_columns(&pool, "users").await.unwrap();
            assert_eq!(columns.len(), 3);

            let id = &columns[0];
            assert_eq!(id.column_name, "id");
            assert!(id.primary_key);
            assert!(!id.unique);

            let email = &columns[1];
            assert!(email.not_null);
            assert!(email.unique);
            assert!(!email.primary_key);

            let bio = &columns[2];
            assert_eq!(bio.default_value.as_deref(), Some("'none'"));
            assert!(!bio.not_null);
        });
    }

    #[test]
    fn test_composite_primary_key() {
        smol::block_on(async {
            let pool = memory_pool().await;
            sqlx::query(
                "CREATE TABLE memberships (
                    user_id INTEGER,
                    group_id INTEGER,
                    role TEXT,
                    PRIMARY KEY (user_id, group_id)
                )",
            )
            .execute(&pool)
            .await
            .unwrap();

            let columns = table_columns(&pool, "memberships").await.unwrap();
            let pk_columns: Vec<&str> = columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.column_name.as_str())
                .collect();
            assert_eq!(pk_columns, vec!["user_id", "group_id"]);
        });
    }

    #[test]
    fn test_foreign_key_flag() {
        smol::block_on(async {
            let pool = memory_pool().await;
            sqlx::query("CREATE TABLE teams (id INTEGER PRIMARY KEY)")
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query(
                "CREATE TABLE players (
                    id INTEGER PRIMARY KEY,
                    team_id INTEGER REFERENCES teams(id)
                )",
            )
            .execute(&pool)
            .await
            .unwrap();

            let columns = table_columns(&pool, "players").await.unwrap();
            let team_id = columns
                .iter()
                .find(|c| c.column_name == "team_id")
                .unwrap();
            assert!(team_id.foreign_key);
            assert!(!columns[0].foreign_key);
        });
    }

    #[test]
    fn test_missing_table_is_schema_error() {
        smol::block_on(async {
            let pool = memory_pool().await;
            let err = table_columns(&pool, "nope").await.unwrap_err();
            assert!(matches!(err, DriverError::Schema(_)));
        });
    }
}
