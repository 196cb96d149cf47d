//! SQLite driver implementation.
//!
//! Wraps a SQLx `SqlitePool` behind the uniform `Driver` contract. SQLite
//! supports both file-based and in-memory databases; server parameters are
//! rejected.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_lock::RwLock;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::schema;
use super::types::{bind_value, convert_row, quote_ident};
use crate::database::drivers::batch_columns;
use crate::database::error::{DriverError, Result};
use crate::database::traits::{
    ColumnDescriptor, ConnectionConfig, ConnectionParams, DatabaseType, Driver, QueryResult, Row,
    RowSet, RowUpdate, Value,
};

/// SQLite database driver.
pub struct SqliteDriver {
    config: ConnectionConfig,
    pool: RwLock<Option<SqlitePool>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDriver")
            .field("config", &self.config)
            .field("pool", &"<SqlitePool>")
            .finish()
    }
}

impl SqliteDriver {
    /// Create a new SQLite driver from configuration.
    ///
    /// This does not connect - call `connect()` to open the database.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Build SqliteConnectOptions from the configuration.
    fn build_connect_options(&self) -> Result<SqliteConnectOptions> {
        match &self.config.params {
            ConnectionParams::File { path } => Ok(SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(false)
                .foreign_keys(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)),
            ConnectionParams::InMemory => {
                // Shared cache so every pooled connection sees one database
                let options = SqliteConnectOptions::from_str(":memory:")
                    .map_err(|e| DriverError::Connection(e.to_string()))?
                    .foreign_keys(true)
                    .shared_cache(true);

                Ok(options)
            }
            ConnectionParams::Server { .. } => Err(DriverError::Validation(
                "SQLite does not support server connection parameters".to_string(),
            )),
        }
    }

    /// Get the connection pool, failing if not connected.
    async fn get_pool(&self) -> Result<SqlitePool> {
        let guard = self.pool.read().await;
        guard
            .as_ref()
            .cloned()
            .ok_or_else(DriverError::not_connected)
    }

    /// Check if the statement is a row-returning query.
    fn is_row_returning(sql: &str) -> bool {
        let lower = sql.to_lowercase();
        let trimmed = lower.trim_start();
        trimmed.starts_with("select")
            || trimmed.starts_with("with")
            || trimmed.starts_with("pragma")
    }
}

/// Build a parameterized single-row INSERT statement.
fn build_insert_sql(table: &str, columns: &[&str]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        placeholders
    )
}

/// Build a parameterized UPDATE statement.
fn build_update_sql(table: &str, set_columns: &[&str], key_columns: &[&str]) -> String {
    let assignments: Vec<String> = set_columns
        .iter()
        .map(|c| format!("{} = ?", quote_ident(c)))
        .collect();
    let predicates: Vec<String> = key_columns
        .iter()
        .map(|c| format!("{} = ?", quote_ident(c)))
        .collect();

    format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(table),
        assignments.join(", "),
        predicates.join(" AND ")
    )
}

/// Run one UPDATE against any executor (pool or open transaction).
///
/// Columns that appear in `match_keys` never appear in the SET clause.
async fn run_update<'e, E>(executor: E, table: &str, data: &Row, match_keys: &Row) -> Result<u64>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    if match_keys.is_empty() {
        return Err(DriverError::Validation(
            "match keys must not be empty".to_string(),
        ));
    }

    let set_columns: Vec<&str> = data
        .columns()
        .filter(|column| !match_keys.contains(column))
        .collect();
    if set_columns.is_empty() {
        return Err(DriverError::Validation(
            "no columns to update after removing match keys".to_string(),
        ));
    }

    let key_columns: Vec<&str> = match_keys.columns().collect();
    let sql = build_update_sql(table, &set_columns, &key_columns);

    let mut query = sqlx::query(&sql);
    for column in &set_columns {
        query = bind_value(query, data.get(column).unwrap_or(&Value::Null));
    }
    for column in &key_columns {
        query = bind_value(query, match_keys.get(column).unwrap_or(&Value::Null));
    }

    let done = query.execute(executor).await?;
    Ok(done.rows_affected())
}

#[async_trait]
impl Driver for SqliteDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn connection_config(&self) -> &ConnectionConfig {
        &self.config
    }

    async fn connect(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DriverError::Connection(
                "driver has been closed; create a new instance".to_string(),
            ));
        }

        let options = self.build_connect_options()?;

        // SQLite pools stay small due to the single-writer limitation
        let pool = SqlitePoolOptions::new()
            .max_connections(3)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(|e| DriverError::Connection(e.to_string()))?;

        // A missing or corrupt file must surface from connect(), not from
        // the first data operation
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| DriverError::Connection(e.to_string()))?;

        let mut guard = self.pool.write().await;
        *guard = Some(pool);

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);

        let mut guard = self.pool.write().await;
        if let Some(pool) = guard.take() {
            pool.close().await;
        }

        Ok(())
    }

    async fn get_tables(&self) -> Result<Vec<String>> {
        let pool = self.get_pool().await?;
        schema::table_names(&pool).await
    }

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let pool = self.get_pool().await?;
        schema::table_columns(&pool, table).await
    }

    async fn get_all_rows(
        &self,
        table: &str,
        limit: u32,
        offset: u64,
        search_text: Option<&str>,
        search_column: Option<&str>,
    ) -> Result<RowSet> {
        let pool = self.get_pool().await?;

        let filter = match (search_text, search_column) {
            (Some(text), Some(column)) if !text.is_empty() && !column.is_empty() => {
                Some((format!("%{}%", text), column))
            }
            _ => None,
        };

        let where_clause = match &filter {
            Some((_, column)) => format!(" WHERE {} LIKE ?", quote_ident(column)),
            None => String::new(),
        };

        let count_sql = format!("SELECT COUNT(*) FROM {}{}", quote_ident(table), where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some((pattern, _)) = &filter {
            count_query = count_query.bind(pattern.clone());
        }
        let total = count_query.fetch_one(&pool).await?;

        let select_sql = format!(
            "SELECT * FROM {}{} LIMIT ? OFFSET ?",
            quote_ident(table),
            where_clause
        );
        let mut rows_query = sqlx::query(&select_sql);
        if let Some((pattern, _)) = &filter {
            rows_query = rows_query.bind(pattern.clone());
        }
        rows_query = rows_query.bind(limit as i64).bind(offset as i64);

        let rows = rows_query.fetch_all(&pool).await?;

        Ok(RowSet::new(
            rows.iter().map(convert_row).collect(),
            total.max(0) as u64,
        ))
    }

    async fn insert_rows(&self, table: &str, rows: &[Row]) -> Result<()> {
        let pool = self.get_pool().await?;
        let columns = batch_columns(rows)?;
        let sql = build_insert_sql(table, &columns);

        let mut tx = pool.begin().await?;
        for row in rows {
            let mut query = sqlx::query(&sql);
            for column in &columns {
                query = bind_value(query, row.get(column).unwrap_or(&Value::Null));
            }
            if let Err(err) = query.execute(&mut *tx).await {
                tx.rollback().await.ok();
                return Err(err.into());
            }
        }
        tx.commit().await?;

        Ok(())
    }

    async fn update_row(&self, table: &str, data: &Row, match_keys: &Row) -> Result<u64> {
        let pool = self.get_pool().await?;
        run_update(&pool, table, data, match_keys).await
    }

    async fn update_rows(&self, table: &str, updates: &[RowUpdate]) -> Result<u64> {
        let pool = self.get_pool().await?;

        let mut tx = pool.begin().await?;
        let mut affected = 0;
        for update in updates {
            match run_update(&mut *tx, table, &update.data, &update.original_keys).await {
                Ok(count) => affected += count,
                Err(err) => {
                    tx.rollback().await.ok();
                    return Err(err);
                }
            }
        }
        tx.commit().await?;

        Ok(affected)
    }

    async fn delete_row(&self, table: &str, key_column: &str, key_value: &Value) -> Result<()> {
        let pool = self.get_pool().await?;

        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_ident(table),
            quote_ident(key_column)
        );
        bind_value(sqlx::query(&sql), key_value)
            .execute(&pool)
            .await?;

        Ok(())
    }

    async fn execute_query(&self, sql: &str) -> QueryResult {
        let pool = match self.get_pool().await {
            Ok(pool) => pool,
            Err(err) => return QueryResult::failure(err),
        };

        let sql = sql.trim();
        if sql.is_empty() {
            return QueryResult::Failure("empty query".to_string());
        }

        if Self::is_row_returning(sql) {
            match sqlx::query(sql).fetch_all(&pool).await {
                Ok(rows) => QueryResult::Rows(rows.iter().map(convert_row).collect()),
                // Retry as a plain statement before giving up
                Err(_) => match sqlx::query(sql).execute(&pool).await {
                    Ok(done) => {
                        QueryResult::Statement(format!("OK, {} row(s) affected", done.rows_affected()))
                    }
                    Err(err) => QueryResult::failure(err),
                },
            }
        } else {
            match sqlx::query(sql).execute(&pool).await {
                Ok(done) => {
                    QueryResult::Statement(format!("OK, {} row(s) affected", done.rows_affected()))
                }
                Err(err) => QueryResult::failure(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn file_config(path: &Path) -> ConnectionConfig {
        ConnectionConfig::new(
            "test".to_string(),
            DatabaseType::Sqlite,
            ConnectionParams::file(path.to_path_buf()),
        )
    }

    /// Create the database file with a `users` table and return a connected
    /// driver for it. `connect()` itself refuses to create missing files.
    async fn seeded_driver(dir: &tempfile::TempDir) -> SqliteDriver {
        let path = dir.path().join("test.db");

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT UNIQUE)")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let driver = SqliteDriver::new(file_config(&path));
        driver.connect().await.unwrap();
        driver
    }

    fn user(id: i64, name: &str, email: &str) -> Row {
        Row::new()
            .with("id", id)
            .with("name", name)
            .with("email", email)
    }

    #[test]
    fn test_is_row_returning() {
        assert!(SqliteDriver::is_row_returning("SELECT * FROM users"));
        assert!(SqliteDriver::is_row_returning("  select 1"));
        assert!(SqliteDriver::is_row_returning(
            "WITH cte AS (SELECT 1) SELECT * FROM cte"
        ));
        assert!(SqliteDriver::is_row_returning("PRAGMA table_info(users)"));

        assert!(!SqliteDriver::is_row_returning("INSERT INTO users VALUES (1)"));
        assert!(!SqliteDriver::is_row_returning("DROP TABLE users"));
    }

    #[test]
    fn test_build_insert_sql() {
        assert_eq!(
            build_insert_sql("users", &["id", "name"]),
            "INSERT INTO \"users\" (\"id\", \"name\") VALUES (?, ?)"
        );
    }

    #[test]
    fn test_build_update_sql() {
        assert_eq!(
            build_update_sql("users", &["name", "email"], &["id"]),
            "UPDATE \"users\" SET \"name\" = ?, \"email\" = ? WHERE \"id\" = ?"
        );
        assert_eq!(
            build_update_sql("m", &["role"], &["user_id", "group_id"]),
            "UPDATE \"m\" SET \"role\" = ? WHERE \"user_id\" = ? AND \"group_id\" = ?"
        );
    }

    #[test]
    fn test_connect_missing_file_fails() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let driver = SqliteDriver::new(file_config(&dir.path().join("missing.db")));

            let err = driver.connect().await.unwrap_err();
            assert!(matches!(err, DriverError::Connection(_)));
        });
    }

    #[test]
    fn test_server_params_rejected() {
        smol::block_on(async {
            let config = ConnectionConfig::new(
                "test".to_string(),
                DatabaseType::Sqlite,
                ConnectionParams::server(
                    "localhost".to_string(),
                    5432,
                    "user".to_string(),
                    "pass".to_string(),
                    "db".to_string(),
                ),
            );
            let driver = SqliteDriver::new(config);
            assert!(matches!(
                driver.connect().await.unwrap_err(),
                DriverError::Validation(_)
            ));
        });
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let driver = seeded_driver(&dir).await;

            driver.close().await.unwrap();
            driver.close().await.unwrap();

            let err = driver.get_tables().await.unwrap_err();
            assert!(matches!(err, DriverError::Connection(_)));

            // No transition back out of Closed
            let err = driver.connect().await.unwrap_err();
            assert!(matches!(err, DriverError::Connection(_)));
        });
    }

    #[test]
    fn test_insert_and_fetch_roundtrip() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let driver = seeded_driver(&dir).await;

            driver
                .insert_rows("users", &[user(1, "ada", "ada@example.com")])
                .await
                .unwrap();

            let page = driver
                .get_all_rows("users", 10, 0, Some("ada@example.com"), Some("email"))
                .await
                .unwrap();

            assert_eq!(page.total, 1);
            assert_eq!(page.rows.len(), 1);
            let row = &page.rows[0];
            assert_eq!(row.get("id"), Some(&Value::Int64(1)));
            assert_eq!(row.get("name"), Some(&Value::Text("ada".to_string())));
        });
    }

    #[test]
    fn test_batch_insert_rolls_back_on_violation() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let driver = seeded_driver(&dir).await;

            let batch = vec![
                user(1, "ada", "dup@example.com"),
                user(2, "grace", "dup@example.com"),
            ];
            let err = driver.insert_rows("users", &batch).await.unwrap_err();
            assert!(matches!(err, DriverError::Constraint(_)));

            // Neither row survives the rollback
            let page = driver.get_all_rows("users", 10, 0, None, None).await.unwrap();
            assert_eq!(page.total, 0);
        });
    }

    #[test]
    fn test_insert_validation() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let driver = seeded_driver(&dir).await;

            let err = driver.insert_rows("users", &[]).await.unwrap_err();
            assert!(matches!(err, DriverError::Validation(_)));

            let mismatched = vec![
                Row::new().with("id", 1i64).with("name", "a"),
                Row::new().with("id", 2i64).with("email", "b@example.com"),
            ];
            let err = driver.insert_rows("users", &mismatched).await.unwrap_err();
            assert!(matches!(err, DriverError::Validation(_)));
        });
    }

    #[test]
    fn test_pagination_pages_are_disjoint() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let driver = seeded_driver(&dir).await;

            let batch: Vec<Row> = (1..=25)
                .map(|i| user(i, &format!("user{}", i), &format!("u{}@example.com", i)))
                .collect();
            driver.insert_rows("users", &batch).await.unwrap();

            let first = driver.get_all_rows("users", 10, 0, None, None).await.unwrap();
            let second = driver.get_all_rows("users", 10, 10, None, None).await.unwrap();
            let third = driver.get_all_rows("users", 10, 20, None, None).await.unwrap();

            assert_eq!(first.total, 25);
            assert_eq!(first.rows.len(), 10);
            assert_eq!(second.rows.len(), 10);
            assert_eq!(third.rows.len(), 5);
            assert_eq!(first.page_count(10), 3);

            let ids = |set: &RowSet| -> Vec<i64> {
                set.rows
                    .iter()
                    .map(|r| r.get("id").and_then(Value::as_i64).unwrap())
                    .collect()
            };
            let mut all = ids(&first);
            all.extend(ids(&second));
            all.extend(ids(&third));
            all.sort_unstable();
            all.dedup();
            assert_eq!(all.len(), 25);
        });
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let driver = seeded_driver(&dir).await;

            let batch = vec![
                user(1, "alpha", "a@example.com"),
                user(2, "beta", "b@example.com"),
                user(3, "ALPHABET", "c@example.com"),
            ];
            driver.insert_rows("users", &batch).await.unwrap();

            let page = driver
                .get_all_rows("users", 10, 0, Some("alpha"), Some("name"))
                .await
                .unwrap();

            assert_eq!(page.total, 2);
            let names: Vec<&str> = page
                .rows
                .iter()
                .map(|r| r.get("name").and_then(Value::as_str).unwrap())
                .collect();
            assert!(names.contains(&"alpha"));
            assert!(names.contains(&"ALPHABET"));

            // Search with only one of text/column behaves as unfiltered
            let page = driver
                .get_all_rows("users", 10, 0, Some("alpha"), None)
                .await
                .unwrap();
            assert_eq!(page.total, 3);
        });
    }

    #[test]
    fn test_update_row_no_match_returns_zero() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let driver = seeded_driver(&dir).await;

            let affected = driver
                .update_row(
                    "users",
                    &Row::new().with("name", "x"),
                    &Row::new().with("id", 5i64),
                )
                .await
                .unwrap();
            assert_eq!(affected, 0);
        });
    }

    #[test]
    fn test_update_row_skips_match_key_columns() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let driver = seeded_driver(&dir).await;
            driver
                .insert_rows("users", &[user(1, "ada", "ada@example.com")])
                .await
                .unwrap();

            // `id` is both data and match key; it must not be assigned
            let data = Row::new().with("id", 99i64).with("name", "lovelace");
            let keys = Row::new().with("id", 1i64);
            let affected = driver.update_row("users", &data, &keys).await.unwrap();
            assert_eq!(affected, 1);

            let page = driver.get_all_rows("users", 10, 0, None, None).await.unwrap();
            let row = &page.rows[0];
            assert_eq!(row.get("id"), Some(&Value::Int64(1)));
            assert_eq!(row.get("name"), Some(&Value::Text("lovelace".to_string())));
        });
    }

    #[test]
    fn test_update_rows_batch_is_atomic() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let driver = seeded_driver(&dir).await;
            driver
                .insert_rows(
                    "users",
                    &[
                        user(1, "ada", "ada@example.com"),
                        user(2, "grace", "grace@example.com"),
                    ],
                )
                .await
                .unwrap();

            let updates = vec![
                RowUpdate::new(
                    Row::new().with("name", "renamed"),
                    Row::new().with("id", 1i64),
                ),
                // Collides with ada's unique email, forcing a rollback
                RowUpdate::new(
                    Row::new().with("email", "ada@example.com"),
                    Row::new().with("id", 2i64),
                ),
            ];
            let err = driver.update_rows("users", &updates).await.unwrap_err();
            assert!(matches!(err, DriverError::Constraint(_)));

            let page = driver.get_all_rows("users", 10, 0, None, None).await.unwrap();
            let first = page
                .rows
                .iter()
                .find(|r| r.get("id") == Some(&Value::Int64(1)))
                .unwrap();
            assert_eq!(first.get("name"), Some(&Value::Text("ada".to_string())));
        });
    }

    #[test]
    fn test_update_rows_sums_affected() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let driver = seeded_driver(&dir).await;
            driver
                .insert_rows(
                    "users",
                    &[
                        user(1, "ada", "ada@example.com"),
                        user(2, "grace", "grace@example.com"),
                    ],
                )
                .await
                .unwrap();

            let updates = vec![
                RowUpdate::new(
                    Row::new().with("name", "one"),
                    Row::new().with("id", 1i64),
                ),
                RowUpdate::new(
                    Row::new().with("name", "two"),
                    Row::new().with("id", 2i64),
                ),
            ];
            let affected = driver.update_rows("users", &updates).await.unwrap();
            assert_eq!(affected, 2);
        });
    }

    #[test]
    fn test_delete_row() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let driver = seeded_driver(&dir).await;
            driver
                .insert_rows("users", &[user(1, "ada", "ada@example.com")])
                .await
                .unwrap();

            driver
                .delete_row("users", "id", &Value::Int64(1))
                .await
                .unwrap();
            let page = driver.get_all_rows("users", 10, 0, None, None).await.unwrap();
            assert_eq!(page.total, 0);

            // Deleting nothing is not an error
            driver
                .delete_row("users", "id", &Value::Int64(42))
                .await
                .unwrap();
        });
    }

    #[test]
    fn test_execute_query_rows_and_statements() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let driver = seeded_driver(&dir).await;

            let result = driver.execute_query("SELECT 1 AS one").await;
            match result {
                QueryResult::Rows(rows) => {
                    assert_eq!(rows.len(), 1);
                    assert_eq!(rows[0].get("one"), Some(&Value::Int64(1)));
                }
                other => panic!("expected rows, got {:?}", other),
            }

            let result = driver
                .execute_query("INSERT INTO users (id, name, email) VALUES (7, 'x', 'x@example.com')")
                .await;
            assert_eq!(
                result,
                QueryResult::Statement("OK, 1 row(s) affected".to_string())
            );

            let result = driver.execute_query("DROP TABLE nonexistent_xyz").await;
            match result {
                QueryResult::Failure(message) => assert!(message.contains("nonexistent_xyz")),
                other => panic!("expected failure, got {:?}", other),
            }

            assert!(!driver.execute_query("").await.success());
        });
    }
}
