//! Database abstraction traits and types.
//!
//! This module provides the uniform surface every backend implements:
//!
//! - **Types** (`types`): Database kind enum and connection configuration
//! - **Row/Value** (`row`): Backend-agnostic value and row representation
//! - **Schema** (`schema`): Normalized column metadata
//! - **Connection** (`connection`): The `Driver` trait and query results

pub mod connection;
pub mod row;
pub mod schema;
pub mod types;

// Re-export commonly used types
pub use connection::{Driver, QueryResult, SharedDriver};

pub use row::{Row, RowSet, RowUpdate, Value};

pub use schema::ColumnDescriptor;

pub use types::{ConnectionConfig, ConnectionParams, DatabaseType};
