//! Multi-backend database access core.
//!
//! Layered bottom-up:
//!
//! - `traits`: the uniform driver contract and shared types
//! - `drivers`: the SQLite/MySQL/PostgreSQL implementations plus the
//!   caching `DriverFactory`
//! - `registry`: persisted connection configurations
//! - `query_runner`: free-form SQL routed by connection name

pub mod drivers;
pub mod error;
pub mod query_runner;
pub mod registry;
pub mod traits;

pub use drivers::{DriverFactory, MySqlDriver, PostgresDriver, SqliteDriver};
pub use error::{DriverError, Result};
pub use query_runner::QueryRunner;
pub use registry::ConnectionRegistry;
pub use traits::{
    ColumnDescriptor, ConnectionConfig, ConnectionParams, DatabaseType, Driver, QueryResult, Row,
    RowSet, RowUpdate, SharedDriver, Value,
};
