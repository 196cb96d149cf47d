//! Database driver implementations.
//!
//! One module per backend, each implementing the `Driver` trait:
//!
//! - **SQLite**: embedded file/in-memory databases via SQLx
//! - **MySQL**: MySQL/MariaDB via SQLx
//! - **PostgreSQL**: PostgreSQL via SQLx
//!
//! The `DriverFactory` is the single dispatch point that builds, caches,
//! and evicts driver instances.

mod factory;

pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use factory::DriverFactory;
pub use mysql::MySqlDriver;
pub use postgres::PostgresDriver;
pub use sqlite::SqliteDriver;

use crate::database::error::{DriverError, Result};
use crate::database::traits::Row;

/// Validate an insert batch and return its column list.
///
/// Every record must carry the same column set; the order of the first
/// record decides the column order in generated SQL.
pub(crate) fn batch_columns(rows: &[Row]) -> Result<Vec<&str>> {
    let first = rows.first().ok_or_else(|| {
        DriverError::Validation("insert batch must not be empty".to_string())
    })?;
    if first.is_empty() {
        return Err(DriverError::Validation(
            "records must contain at least one column".to_string(),
        ));
    }

    for row in &rows[1..] {
        if !row.same_columns(first) {
            return Err(DriverError::Validation(
                "all records in a batch must share the same column set".to_string(),
            ));
        }
    }

    Ok(first.columns().collect())
}
