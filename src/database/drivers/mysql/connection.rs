//! MySQL driver implementation.
//!
//! Wraps a SQLx `MySqlPool` behind the uniform `Driver` contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_lock::RwLock;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;

use super::schema;
use super::types::{bind_value, convert_row, quote_ident};
use crate::database::drivers::batch_columns;
use crate::database::error::{DriverError, Result};
use crate::database::traits::{
    ColumnDescriptor, ConnectionConfig, ConnectionParams, DatabaseType, Driver, QueryResult, Row,
    RowSet, RowUpdate, Value,
};

/// MySQL database driver.
pub struct MySqlDriver {
    config: ConnectionConfig,
    pool: RwLock<Option<MySqlPool>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for MySqlDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlDriver")
            .field("config", &self.config)
            .field("pool", &"<MySqlPool>")
            .finish()
    }
}

impl MySqlDriver {
    /// Create a new MySQL driver from configuration.
    ///
    /// This does not connect - call `connect()` to establish the session.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Build MySqlConnectOptions from the configuration.
    fn build_connect_options(&self) -> Result<MySqlConnectOptions> {
        match &self.config.params {
            ConnectionParams::Server {
                hostname,
                port,
                username,
                password,
                database,
            } => Ok(MySqlConnectOptions::new()
                .host(hostname)
                .port(*port)
                .username(username)
                .password(password)
                .database(database)),
            ConnectionParams::File { .. } | ConnectionParams::InMemory => {
                Err(DriverError::Validation(
                    "MySQL requires server connection parameters".to_string(),
                ))
            }
        }
    }

    /// Get the connection pool, failing if not connected.
    async fn get_pool(&self) -> Result<MySqlPool> {
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
            || trimmed.starts_with("show")
            || trimmed.starts_with("describe")
            || trimmed.starts_with("desc")
            || trimmed.starts_with("explain")
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
    E: sqlx::Executor<'e, Database = sqlx::MySql>,
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
impl Driver for MySqlDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySql
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

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(|e| DriverError::Connection(e.to_string()))?;

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

        // LIKE is case-insensitive under MySQL's default collations
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

        // MySQL has no multi-row UPDATE; issue one statement per item and
        // sum the affected counts inside a single transaction.
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

    #[test]
    fn test_is_row_returning() {
        assert!(MySqlDriver::is_row_returning("SELECT * FROM users"));
        assert!(MySqlDriver::is_row_returning("SHOW TABLES"));
        assert!(MySqlDriver::is_row_returning("DESCRIBE users"));
        assert!(MySqlDriver::is_row_returning("EXPLAIN SELECT 1"));

        assert!(!MySqlDriver::is_row_returning("INSERT INTO t VALUES (1)"));
        assert!(!MySqlDriver::is_row_returning("TRUNCATE t"));
    }

    #[test]
    fn test_build_insert_sql() {
        assert_eq!(
            build_insert_sql("users", &["id", "name"]),
            "INSERT INTO `users` (`id`, `name`) VALUES (?, ?)"
        );
    }

    #[test]
    fn test_build_update_sql() {
        assert_eq!(
            build_update_sql("users", &["name"], &["id"]),
            "UPDATE `users` SET `name` = ? WHERE `id` = ?"
        );
    }

    #[test]
    fn test_file_params_rejected() {
        let config = ConnectionConfig::new(
            "test".to_string(),
            DatabaseType::MySql,
            ConnectionParams::file(std::path::PathBuf::from("/tmp/test.db")),
        );
        let driver = MySqlDriver::new(config);
        assert!(matches!(
            driver.build_connect_options().unwrap_err(),
            DriverError::Validation(_)
        ));
    }

    #[test]
    fn test_operations_require_connection() {
        smol::block_on(async {
            let config = ConnectionConfig::new(
                "test".to_string(),
                DatabaseType::MySql,
                ConnectionParams::server(
                    "localhost".to_string(),
                    3306,
                    "root".to_string(),
                    "".to_string(),
                    "db".to_string(),
                ),
            );
            let driver = MySqlDriver::new(config);

            let err = driver.get_tables().await.unwrap_err();
            assert!(matches!(err, DriverError::Connection(_)));

            let result = driver.execute_query("SELECT 1").await;
            assert!(!result.success());
        });
    }
}
