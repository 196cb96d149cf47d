//! SQLite driver.

mod connection;
mod schema;
mod types;

pub use connection::SqliteDriver;
