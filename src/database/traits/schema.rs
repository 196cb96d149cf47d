//! Normalized column metadata.
//!
//! Every backend's introspection query produces the same `ColumnDescriptor`
//! shape; the detection heuristics behind each flag stay backend-local.

use serde::{Deserialize, Serialize};

/// Normalized metadata for one table column.
///
/// Produced fresh on every `get_columns` call - never cached, since the
/// schema can change between calls. For a composite primary key every
/// participating column has `primary_key` set; ordering across the composite
/// follows the backend's native column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub column_name: String,
    /// Backend-native type string (e.g. "INTEGER", "varchar(255)")
    pub data_type: String,
    /// Declared length for character types, when the backend reports one
    pub length: Option<i64>,
    /// Column comment, when the backend supports them
    pub comment: Option<String>,
    /// Default value expression as reported by the backend
    pub default_value: Option<String>,
    /// Whether NULL values are rejected
    pub not_null: bool,
    /// Whether the column is part of the primary key
    pub primary_key: bool,
    /// Whether the column carries a single-column unique constraint
    pub unique: bool,
    /// Whether the backend assigns values automatically on insert
    pub is_auto_increment: bool,
    /// Whether a foreign-key constraint references another table through
    /// this column
    pub foreign_key: bool,
}

impl ColumnDescriptor {
    /// Create a descriptor with all flags cleared
    pub fn new(column_name: String, data_type: String) -> Self {
        Self {
            column_name,
            data_type,
            length: None,
            comment: None,
            default_value: None,
            not_null: false,
            primary_key: false,
            unique: false,
            is_auto_increment: false,
            foreign_key: false,
        }
    }
}
