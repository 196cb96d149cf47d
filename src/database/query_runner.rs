//! Free-form SQL execution helper.
//!
//! Routes a raw SQL string to the right driver by connection name and
//! normalizes every failure into the tagged `QueryResult` shape. This path
//! is driven by user-typed SQL, possibly against connections that have been
//! removed, so it never returns an `Err`.

use std::sync::Arc;

use super::drivers::DriverFactory;
use super::registry::ConnectionRegistry;
use super::traits::QueryResult;

/// Resolves a connection name to a driver and executes raw SQL on it.
#[derive(Clone)]
pub struct QueryRunner {
    registry: Arc<ConnectionRegistry>,
    factory: Arc<DriverFactory>,
}

impl std::fmt::Debug for QueryRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryRunner").finish()
    }
}

impl QueryRunner {
    /// Create a runner over the given registry and factory.
    pub fn new(registry: Arc<ConnectionRegistry>, factory: Arc<DriverFactory>) -> Self {
        Self { registry, factory }
    }

    /// Execute `sql` against the connection registered under `connection`.
    ///
    /// Unknown connection names and driver construction failures come back
    /// as [`QueryResult::Failure`] with a descriptive message.
    pub async fn run(&self, connection: &str, sql: &str) -> QueryResult {
        let Some(config) = self.registry.get(connection).await else {
            return QueryResult::Failure(format!(
                "no connection named '{connection}' is registered"
            ));
        };

        let driver = match self.factory.create(&config, connection).await {
            Ok(driver) => driver,
            Err(err) => return QueryResult::failure(err),
        };

        tracing::debug!(connection, "executing free-form query");
        driver.execute_query(sql).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::traits::{
        ConnectionConfig, ConnectionParams, DatabaseType, Value,
    };
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    async fn runner_with_sqlite(dir: &tempfile::TempDir) -> QueryRunner {
        let db_path = dir.path().join("app.db");

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let registry = Arc::new(
            ConnectionRegistry::open(dir.path().join("connections.json"))
                .await
                .unwrap(),
        );
        registry
            .register(ConnectionConfig::new(
                "notes".to_string(),
                DatabaseType::Sqlite,
                ConnectionParams::file(db_path),
            ))
            .await
            .unwrap();

        QueryRunner::new(registry, Arc::new(DriverFactory::new()))
    }

    #[test]
    fn test_unknown_connection_is_reported_not_thrown() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let runner = runner_with_sqlite(&dir).await;

            let result = runner.run("gone", "SELECT 1").await;
            match result {
                QueryResult::Failure(message) => assert!(message.contains("gone")),
                other => panic!("expected failure, got {:?}", other),
            }
        });
    }

    #[test]
    fn test_run_select_and_statement() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let runner = runner_with_sqlite(&dir).await;

            let result = runner
                .run("notes", "INSERT INTO notes (id, body) VALUES (1, 'hi')")
                .await;
            assert!(result.success());

            let result = runner.run("notes", "SELECT body FROM notes").await;
            match result {
                QueryResult::Rows(rows) => {
                    assert_eq!(rows.len(), 1);
                    assert_eq!(rows[0].get("body"), Some(&Value::Text("hi".to_string())));
                }
                other => panic!("expected rows, got {:?}", other),
            }
        });
    }

    #[test]
    fn test_malformed_sql_is_reported() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let runner = runner_with_sqlite(&dir).await;

            let result = runner.run("notes", "SELEC wrong").await;
            assert!(!result.success());
        });
    }
}
