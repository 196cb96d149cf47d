//! Driver factory and connection cache.
//!
//! The factory is the single dispatch point for backend selection and the
//! only code that mutates the driver cache: insertions happen on successful
//! connect, removals on disconnect. Construct one explicitly and pass it by
//! reference to whatever needs it.

use std::collections::HashMap;
use std::sync::Arc;

use async_lock::Mutex;

use super::{MySqlDriver, PostgresDriver, SqliteDriver};
use crate::database::error::Result;
use crate::database::traits::{ConnectionConfig, DatabaseType, Driver, SharedDriver};

/// Creates, caches, and evicts driver instances, keyed by connection name.
///
/// At most one live driver exists per name: creation always checks the
/// cache first, registration is the only insert path, and the cache lock is
/// held across the whole check-connect-insert sequence so two concurrent
/// `create` calls for one name cannot double-connect.
pub struct DriverFactory {
    drivers: Mutex<HashMap<String, SharedDriver>>,
}

impl std::fmt::Debug for DriverFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverFactory").finish()
    }
}

impl DriverFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self {
            drivers: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached driver for `name`, or construct, connect, and
    /// register a new one from `config`.
    ///
    /// A cached driver is returned unchanged - its liveness is not probed;
    /// reconnecting after a downstream error is the caller's call (evict
    /// with [`disconnect`](Self::disconnect), then `create` again).
    ///
    /// # Errors
    ///
    /// Propagates validation and connection errors; nothing is cached on
    /// failure.
    pub async fn create(&self, config: &ConnectionConfig, name: &str) -> Result<SharedDriver> {
        let mut drivers = self.drivers.lock().await;

        if let Some(driver) = drivers.get(name) {
            tracing::debug!(connection = name, "reusing cached driver");
            return Ok(driver.clone());
        }

        config.validate()?;

        let driver: SharedDriver = match config.database_type {
            DatabaseType::Sqlite => Arc::new(SqliteDriver::new(config.clone())),
            DatabaseType::MySql => Arc::new(MySqlDriver::new(config.clone())),
            DatabaseType::Postgres => Arc::new(PostgresDriver::new(config.clone())),
        };

        driver.connect().await?;
        drivers.insert(name.to_string(), driver.clone());
        tracing::debug!(
            connection = name,
            kind = %config.database_type,
            "connected new driver"
        );

        Ok(driver)
    }

    /// Close and evict the driver cached under `name`, if any.
    ///
    /// Close errors are logged and swallowed; the cache entry is removed
    /// unconditionally.
    pub async fn disconnect(&self, name: &str) {
        let removed = self.drivers.lock().await.remove(name);

        if let Some(driver) = removed {
            if let Err(err) = driver.close().await {
                tracing::warn!(connection = name, "error while closing driver: {err}");
            }
            tracing::debug!(connection = name, "evicted driver");
        }
    }

    /// Close and evict every cached driver.
    pub async fn disconnect_all(&self) {
        let drained: Vec<(String, SharedDriver)> =
            self.drivers.lock().await.drain().collect();

        for (name, driver) in drained {
            if let Err(err) = driver.close().await {
                tracing::warn!(connection = %name, "error while closing driver: {err}");
            }
        }
    }

    /// Check whether a driver is currently cached under `name`.
    pub async fn is_cached(&self, name: &str) -> bool {
        self.drivers.lock().await.contains_key(name)
    }

    /// Verify that a configuration can be connected to, without caching
    /// anything. Used to test connection parameters before saving them.
    pub async fn test_connection(config: &ConnectionConfig) -> Result<()> {
        config.validate()?;

        let driver: Box<dyn Driver> = match config.database_type {
            DatabaseType::Sqlite => Box::new(SqliteDriver::new(config.clone())),
            DatabaseType::MySql => Box::new(MySqlDriver::new(config.clone())),
            DatabaseType::Postgres => Box::new(PostgresDriver::new(config.clone())),
        };

        driver.connect().await?;
        driver.close().await?;

        Ok(())
    }
}

impl Default for DriverFactory {
    fn default() -> Self {
        Self::new()
    }
}
