//! PostgreSQL driver implementation.
//!
//! Wraps a SQLx `PgPool` behind the uniform `Driver` contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_lock::RwLock;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use super::schema;
use super::types::{bind_value, convert_row, quote_ident};
use crate::database::drivers::batch_columns;
use crate::database::error::{DriverError, Result};
use crate::database::traits::{
    ColumnDescriptor, ConnectionConfig, ConnectionParams, DatabaseType, Driver, QueryResult, Row,
    RowSet, RowUpdate, Value,
};

/// PostgreSQL database driver.
pub struct PostgresDriver {
    config: ConnectionConfig,
    pool: RwLock<Option<PgPool>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for PostgresDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDriver")
            .field("config", &self.config)
            .field("pool", &"<PgPool>")
            .finish()
    }
}

impl PostgresDriver {
    /// Create a new PostgreSQL driver from configuration.
    ///
    /// This does not connect - call `connect()` to establish the session.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Build PgConnectOptions from the configuration.
    fn build_connect_options(&self) -> Result<PgConnectOptions> {
        match &self.config.params {
            ConnectionParams::Server {
                hostname,
                port,
                username,
                password,
                database,
            } => Ok(PgConnectOptions::new()
                .host(hostname)
                .port(*port)
                .username(username)
                .password(password)
                .database(database)),
            ConnectionParams::File { .. } | ConnectionParams::InMemory => {
                Err(DriverError::Validation(
                    "PostgreSQL requires server connection parameters".to_string(),
                ))
            }
        }
    }

    /// Get the connection pool, failing if not connected.
    async fn get_pool(&self) -> Result<PgPool> {
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
        trimmed.starts_with("select") || trimmed.starts_with("with")
    }
}

/// Build one multi-row INSERT covering `row_count` records, returning the
/// inserted rows so defaulted columns surface to the caller.
fn build_multi_insert_sql(table: &str, columns: &[&str], row_count: usize) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();

    let mut placeholder = 1;
    let mut groups = Vec::with_capacity(row_count);
    for _ in 0..row_count {
        let group: Vec<String> = (0..columns.len())
            .map(|_| {
                let p = format!("${}", placeholder);
                placeholder += 1;
                p
            })
            .collect();
        groups.push(format!("({})", group.join(", ")));
    }

    format!(
        "INSERT INTO {} ({}) VALUES {} RETURNING *",
        quote_ident(table),
        names.join(", "),
        groups.join(", ")
    )
}

/// Build a parameterized UPDATE statement with `$n` numbering across the
/// SET and WHERE clauses.
fn build_update_sql(table: &str, set_columns: &[&str], key_columns: &[&str]) -> String {
    let mut placeholder = 1;

    let assignments: Vec<String> = set_columns
        .iter()
        .map(|c| {
            let clause = format!("{} = ${}", quote_ident(c), placeholder);
            placeholder += 1;
            clause
        })
        .collect();
    let predicates: Vec<String> = key_columns
        .iter()
        .map(|c| {
            let clause = format!("{} = ${}", quote_ident(c), placeholder);
            placeholder += 1;
            clause
        })
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
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
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
impl Driver for PostgresDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
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

        let pool = PgPoolOptions::new()
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

        let (total, rows) = match &filter {
            Some((pattern, column)) => {
                let count_sql = format!(
                    "SELECT COUNT(*) FROM {} WHERE {}::text ILIKE $1",
                    quote_ident(table),
                    quote_ident(column)
                );
                let total: i64 = sqlx::query_scalar(&count_sql)
                    .bind(pattern.clone())
                    .fetch_one(&pool)
                    .await?;

                let select_sql = format!(
                    "SELECT * FROM {} WHERE {}::text ILIKE $1 LIMIT $2 OFFSET $3",
                    quote_ident(table),
                    quote_ident(column)
                );
                let rows = sqlx::query(&select_sql)
                    .bind(pattern.clone())
                    .bind(limit as i64)
                    .bind(offset as i64)
                    .fetch_all(&pool)
                    .await?;

                (total, rows)
            }
            None => {
                let count_sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
                let total: i64 = sqlx::query_scalar(&count_sql).fetch_one(&pool).await?;

                let select_sql =
                    format!("SELECT * FROM {} LIMIT $1 OFFSET $2", quote_ident(table));
                let rows = sqlx::query(&select_sql)
                    .bind(limit as i64)
                    .bind(offset as i64)
                    .fetch_all(&pool)
                    .await?;

                (total, rows)
            }
        };

        Ok(RowSet::new(
            rows.iter().map(convert_row).collect(),
            total.max(0) as u64,
        ))
    }

    async fn insert_rows(&self, table: &str, rows: &[Row]) -> Result<()> {
        let pool = self.get_pool().await?;
        batch_columns(rows)?;

        // Null/absent fields are dropped so column defaults apply; the
        // column list comes from the first record, which every record in
        // the batch must therefore be compatible with.
        let columns: Vec<&str> = rows[0]
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, _)| name)
            .collect();
        if columns.is_empty() {
            return Err(DriverError::Validation(
                "first record has no non-null columns".to_string(),
            ));
        }

        let sql = build_multi_insert_sql(table, &columns, rows.len());

        let mut query = sqlx::query(&sql);
        for row in rows {
            for column in &columns {
                query = bind_value(query, row.get(column).unwrap_or(&Value::Null));
            }
        }

        // One statement, so the batch is atomic without an explicit
        // transaction
        query.fetch_all(&pool).await?;

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
            "DELETE FROM {} WHERE {} = $1",
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
