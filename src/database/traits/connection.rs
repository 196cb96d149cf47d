//! Core database driver trait.
//!
//! This module defines the `Driver` trait that all backend drivers implement,
//! plus the `QueryResult` shape returned by free-form SQL execution.

use async_trait::async_trait;
use std::sync::Arc;

use crate::database::error::Result;

use super::row::{Row, RowSet, RowUpdate, Value};
use super::schema::ColumnDescriptor;
use super::types::{ConnectionConfig, DatabaseType};

/// Result of executing free-form SQL.
///
/// `execute_query` never fails with an `Err`; every outcome, including
/// malformed SQL, is captured in one of these variants.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// A row-returning statement succeeded
    Rows(Vec<Row>),
    /// A non-row-returning statement succeeded; carries a success message
    Statement(String),
    /// The statement failed; carries a human-readable error message only
    Failure(String),
}

impl QueryResult {
    /// Whether the statement executed successfully
    pub fn success(&self) -> bool {
        !matches!(self, Self::Failure(_))
    }

    /// Build a failure result from any displayable error
    pub fn failure(err: impl std::fmt::Display) -> Self {
        Self::Failure(err.to_string())
    }
}

/// Core trait for all backend drivers.
///
/// A driver owns exactly one live backend session and moves through the
/// states Uninitialized -> Connected -> Closed: `Connected` is entered only
/// by a successful [`connect`](Driver::connect), every data operation
/// requires it, and there is no way back from `Closed` - build a new
/// instance instead. All methods take `&self`; drivers use interior
/// mutability so cached instances can be shared.
///
/// # Example
///
/// ```ignore
/// use dbrowse::database::traits::Driver;
///
/// async fn example(driver: &dyn Driver) -> dbrowse::database::Result<()> {
///     for table in driver.get_tables().await? {
///         let page = driver.get_all_rows(&table, 20, 0, None, None).await?;
///         println!("{}: {} rows", table, page.total);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Driver: Send + Sync {
    /// Get the database kind for this driver
    fn database_type(&self) -> DatabaseType;

    /// Get the connection configuration this driver was built from
    fn connection_config(&self) -> &ConnectionConfig;

    /// Establish the backend session.
    ///
    /// # Errors
    ///
    /// Fails with a connection error if the target is unreachable, the
    /// credentials are invalid, or the file does not exist / is not a valid
    /// database file.
    async fn connect(&self) -> Result<()>;

    /// Release the backend session.
    ///
    /// Idempotent: closing an already-closed driver is a no-op, not an
    /// error.
    async fn close(&self) -> Result<()>;

    /// Return the user table names in the backend's natural catalog order,
    /// excluding internal/system tables. The order is deterministic for a
    /// given catalog state but not guaranteed alphabetical.
    async fn get_tables(&self) -> Result<Vec<String>>;

    /// Return fresh column metadata for a table.
    ///
    /// # Errors
    ///
    /// Fails with a schema error if the table does not exist.
    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// Return one page of rows plus the filtered total.
    ///
    /// When `search_text` and `search_column` are both present and
    /// non-empty, the predicate is "column value contains the text as a
    /// substring, case-insensitive"; otherwise no filter applies. Page *p*
    /// (1-indexed) with page size *s* uses `offset = (p - 1) * s`.
    async fn get_all_rows(
        &self,
        table: &str,
        limit: u32,
        offset: u64,
        search_text: Option<&str>,
        search_column: Option<&str>,
    ) -> Result<RowSet>;

    /// Insert one or more records as a single atomic transaction: either all
    /// records land or none do.
    ///
    /// # Errors
    ///
    /// Fails with a validation error if `rows` is empty or the records do
    /// not share one column set, and with a constraint error on
    /// uniqueness/foreign-key violations (after rollback).
    async fn insert_rows(&self, table: &str, rows: &[Row]) -> Result<()>;

    /// Update the single row identified by `match_keys` with the values in
    /// `data`. Columns present in `match_keys` are skipped in the SET
    /// clause. Returns the number of rows affected; 0 means no row matched
    /// and is not an error.
    async fn update_row(&self, table: &str, data: &Row, match_keys: &Row) -> Result<u64>;

    /// Apply a batch of updates as one atomic transaction, in the order
    /// supplied. Returns the summed affected-row count. Any individual
    /// failure rolls back the whole batch.
    async fn update_rows(&self, table: &str, updates: &[RowUpdate]) -> Result<u64>;

    /// Delete rows matching a single-column equality predicate. Deleting
    /// zero rows is not an error.
    async fn delete_row(&self, table: &str, key_column: &str, key_value: &Value) -> Result<()>;

    /// Run arbitrary SQL.
    ///
    /// Row-returning statements yield [`QueryResult::Rows`]; other
    /// statements are executed and reported as a generic
    /// [`QueryResult::Statement`] message. Never returns an `Err` - all
    /// failures are captured as [`QueryResult::Failure`].
    async fn execute_query(&self, sql: &str) -> QueryResult;
}

/// A shared driver trait object, as stored in the factory cache.
pub type SharedDriver = Arc<dyn Driver>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_result_success_flag() {
        assert!(QueryResult::Rows(vec![]).success());
        assert!(QueryResult::Statement("OK".to_string()).success());
        assert!(!QueryResult::Failure("boom".to_string()).success());
    }

    #[test]
    fn test_query_result_failure_from_display() {
        let result = QueryResult::failure("no such table: users");
        assert_eq!(
            result,
            QueryResult::Failure("no such table: users".to_string())
        );
    }
}
