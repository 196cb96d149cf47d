//! Persisted connection registry.
//!
//! Stores named `ConnectionConfig`s (not live connections) across restarts.
//! The backing store is a single JSON document holding the name-to-config
//! mapping under one fixed key; it is loaded as-is and overwritten wholesale
//! on every mutation - no schema versioning.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_lock::RwLock;

use super::traits::ConnectionConfig;

/// Fixed top-level key the connection mapping lives under in the store file.
const STORE_KEY: &str = "connections";

/// Registry of saved connection configurations.
///
/// The registry is the single writer of the persisted file; all reads go
/// through it. Deleting a connection that has a live driver must be paired
/// with a `DriverFactory::disconnect` for the same name by the caller.
pub struct ConnectionRegistry {
    path: PathBuf,
    connections: RwLock<HashMap<String, ConnectionConfig>>,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("path", &self.path)
            .finish()
    }
}

impl ConnectionRegistry {
    /// Default store location under the user configuration directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dbrowse")
            .join("connections.json")
    }

    /// Open a registry backed by the given file, loading any existing
    /// content. A missing file starts an empty registry.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let connections = match async_fs::read(&path).await {
            Ok(bytes) => parse_store(&bytes)
                .with_context(|| format!("invalid connection store at {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read connection store at {}", path.display())
                });
            }
        };

        Ok(Self {
            path,
            connections: RwLock::new(connections),
        })
    }

    /// Register a configuration under its name, replacing any previous
    /// config with that name, and persist the store.
    pub async fn register(&self, config: ConnectionConfig) -> Result<()> {
        let mut connections = self.connections.write().await;
        connections.insert(config.name.clone(), config);
        self.save(&connections).await
    }

    /// Remove a configuration by name and persist the store. Returns whether
    /// anything was removed.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(name).is_some();
        if removed {
            self.save(&connections).await?;
        }
        Ok(removed)
    }

    /// Look up a configuration by name.
    pub async fn get(&self, name: &str) -> Option<ConnectionConfig> {
        self.connections.read().await.get(name).cloned()
    }

    /// Check whether a name is registered.
    pub async fn contains(&self, name: &str) -> bool {
        self.connections.read().await.contains_key(name)
    }

    /// All registered configurations, ordered by name.
    pub async fn list(&self) -> Vec<ConnectionConfig> {
        let mut configs: Vec<ConnectionConfig> =
            self.connections.read().await.values().cloned().collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        configs
    }

    /// Overwrite the store file with the current mapping.
    async fn save(&self, connections: &HashMap<String, ConnectionConfig>) -> Result<()> {
        let mut store = serde_json::Map::new();
        store.insert(
            STORE_KEY.to_string(),
            serde_json::to_value(connections).context("failed to serialize connections")?,
        );
        let bytes = serde_json::to_vec_pretty(&serde_json::Value::Object(store))
            .context("failed to serialize connection store")?;

        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create store directory {}", parent.display())
            })?;
        }

        async_fs::write(&self.path, bytes)
            .await
            .with_context(|| format!("failed to write connection store at {}", self.path.display()))
    }
}

/// Decode the store document; an absent key means an empty registry.
fn parse_store(bytes: &[u8]) -> Result<HashMap<String, ConnectionConfig>> {
    let doc: serde_json::Value =
        serde_json::from_slice(bytes).context("connection store is not valid JSON")?;

    match doc.get(STORE_KEY) {
        Some(value) => serde_json::from_value(value.clone())
            .context("connection store has an unexpected shape"),
        None => Ok(HashMap::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::traits::{ConnectionParams, DatabaseType};

    fn sample_config(name: &str) -> ConnectionConfig {
        ConnectionConfig::new(
            name.to_string(),
            DatabaseType::Sqlite,
            ConnectionParams::file(PathBuf::from(format!("/tmp/{name}.db"))),
        )
    }

    #[test]
    fn test_open_missing_file_starts_empty() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let registry = ConnectionRegistry::open(dir.path().join("connections.json"))
                .await
                .unwrap();
            assert!(registry.list().await.is_empty());
        });
    }

    #[test]
    fn test_register_get_remove() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let registry = ConnectionRegistry::open(dir.path().join("connections.json"))
                .await
                .unwrap();

            registry.register(sample_config("dev")).await.unwrap();
            assert!(registry.contains("dev").await);
            assert_eq!(registry.get("dev").await.unwrap().name, "dev");

            assert!(registry.remove("dev").await.unwrap());
            assert!(!registry.contains("dev").await);
            assert!(!registry.remove("dev").await.unwrap());
        });
    }

    #[test]
    fn test_register_replaces_under_same_name() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let registry = ConnectionRegistry::open(dir.path().join("connections.json"))
                .await
                .unwrap();

            registry.register(sample_config("dev")).await.unwrap();

            let replacement = ConnectionConfig::new(
                "dev".to_string(),
                DatabaseType::Postgres,
                ConnectionParams::server(
                    "localhost".to_string(),
                    5432,
                    "app".to_string(),
                    "pw".to_string(),
                    "devdb".to_string(),
                ),
            );
            registry.register(replacement.clone()).await.unwrap();

            assert_eq!(registry.list().await.len(), 1);
            assert_eq!(registry.get("dev").await.unwrap(), replacement);
        });
    }

    #[test]
    fn test_persists_across_reopen() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("connections.json");

            {
                let registry = ConnectionRegistry::open(&path).await.unwrap();
                registry.register(sample_config("beta")).await.unwrap();
                registry.register(sample_config("alpha")).await.unwrap();
            }

            let registry = ConnectionRegistry::open(&path).await.unwrap();
            let names: Vec<String> = registry
                .list()
                .await
                .into_iter()
                .map(|c| c.name)
                .collect();
            assert_eq!(names, vec!["alpha".to_string(), "beta".to_string()]);
        });
    }

    #[test]
    fn test_store_document_shape() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("connections.json");

            let registry = ConnectionRegistry::open(&path).await.unwrap();
            registry.register(sample_config("dev")).await.unwrap();

            let doc: serde_json::Value =
                serde_json::from_slice(&async_fs::read(&path).await.unwrap()).unwrap();
            assert!(doc.get(STORE_KEY).is_some());
            assert!(doc[STORE_KEY].get("dev").is_some());
        });
    }

    #[test]
    fn test_open_rejects_corrupt_store() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("connections.json");
            async_fs::write(&path, b"not json").await.unwrap();

            assert!(ConnectionRegistry::open(&path).await.is_err());
        });
    }
}
