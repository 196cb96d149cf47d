//! dbrowse - the driver core of a relational database browser.
//!
//! One polymorphic [`Driver`](database::Driver) contract hides SQLite,
//! MySQL, and PostgreSQL behind a uniform surface: schema introspection,
//! paginated and filtered row fetches, transactional batch writes, and
//! free-form SQL execution. A [`DriverFactory`](database::DriverFactory)
//! caches one live driver per named connection, and a
//! [`ConnectionRegistry`](database::ConnectionRegistry) persists the
//! configurations those drivers are built from.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dbrowse::{
//!     ConnectionConfig, ConnectionParams, ConnectionRegistry, DatabaseType,
//!     DriverFactory, QueryRunner,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = Arc::new(ConnectionRegistry::open(ConnectionRegistry::default_path()).await?);
//! let factory = Arc::new(DriverFactory::new());
//!
//! let config = ConnectionConfig::new(
//!     "local".to_string(),
//!     DatabaseType::Sqlite,
//!     ConnectionParams::file("/tmp/app.db".into()),
//! );
//! registry.register(config.clone()).await?;
//!
//! let driver = factory.create(&config, "local").await?;
//! let page = driver.get_all_rows("users", 20, 0, None, None).await?;
//! println!("{} of {} rows", page.rows.len(), page.total);
//!
//! let runner = QueryRunner::new(registry, factory);
//! let result = runner.run("local", "SELECT count(*) FROM users").await;
//! # Ok(())
//! # }
//! ```

pub mod database;

pub use database::{
    ColumnDescriptor, ConnectionConfig, ConnectionParams, ConnectionRegistry, DatabaseType,
    Driver, DriverError, DriverFactory, MySqlDriver, PostgresDriver, QueryResult, QueryRunner,
    Result, Row, RowSet, RowUpdate, SharedDriver, SqliteDriver, Value,
};
