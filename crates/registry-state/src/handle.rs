//! SurrealDB connection setup
//!
//! Supports in-memory, URL-addressed and cloud (WebSocket) connections. Every
//! connection runs the schema migrations before it is handed out.

use crate::error::StateError;
use crate::migrations;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::info;

const DEFAULT_NAMESPACE: &str = "xds";
const DEFAULT_DATABASE: &str = "registry";
const LOCAL_DB_DIR: &str = ".xdsq/db";

/// Configuration for SurrealDB Cloud connection
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// WebSocket endpoint URL (e.g., "wss://xxx.aws-use1.surrealdb.cloud")
    pub endpoint: String,
    /// Database username
    pub username: String,
    /// Database password
    pub password: String,
    /// Namespace (default: "xds")
    pub namespace: String,
    /// Database name (default: "registry")
    pub database: String,
    /// Whether this is a root user (true) or database user (false)
    pub is_root: bool,
}

impl CloudConfig {
    /// Create a new cloud configuration for a database user
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            is_root: false,
        }
    }

    /// Set custom namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Set custom database
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    /// Set whether this is a root user
    pub fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - SURREALDB_ENDPOINT (required)
    /// - SURREALDB_USERNAME (required)
    /// - SURREALDB_PASSWORD (required)
    /// - SURREALDB_NAMESPACE (optional, default: "xds")
    /// - SURREALDB_DATABASE (optional, default: "registry")
    /// - SURREALDB_ROOT (optional, default: "false") - set to "true" for root users
    pub fn from_env() -> std::result::Result<Self, String> {
        let endpoint =
            std::env::var("SURREALDB_ENDPOINT").map_err(|_| "SURREALDB_ENDPOINT not set")?;
        let username =
            std::env::var("SURREALDB_USERNAME").map_err(|_| "SURREALDB_USERNAME not set")?;
        let password =
            std::env::var("SURREALDB_PASSWORD").map_err(|_| "SURREALDB_PASSWORD not set")?;
        let namespace =
            std::env::var("SURREALDB_NAMESPACE").unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());
        let database =
            std::env::var("SURREALDB_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string());
        let is_root = std::env::var("SURREALDB_ROOT")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        Ok(Self {
            endpoint,
            username,
            password,
            namespace,
            database,
            is_root,
        })
    }
}

/// Connect to a fresh in-memory database with the registry schema.
pub async fn connect_in_memory() -> Result<Surreal<Any>> {
    let db = open("mem://", DEFAULT_NAMESPACE, DEFAULT_DATABASE).await?;
    info!("Registry database connected (in-memory)");
    Ok(db)
}

/// Connect using the environment.
///
/// Tries, in order: [`CloudConfig::from_env`], `SURREALDB_URL`, and finally
/// local persistence under `.xdsq/db`.
pub async fn connect_from_env() -> Result<Surreal<Any>> {
    if let Ok(config) = CloudConfig::from_env() {
        return connect_cloud(&config).await;
    }

    if let Ok(url) = std::env::var("SURREALDB_URL") {
        let db = open(&url, DEFAULT_NAMESPACE, DEFAULT_DATABASE).await?;
        info!("Registry database connected ({})", url);
        return Ok(db);
    }

    std::fs::create_dir_all(LOCAL_DB_DIR).map_err(|e| {
        StateError::Connection(format!(
            "Failed to create database directory {}: {}",
            LOCAL_DB_DIR, e
        ))
    })?;
    let url = format!("surrealkv://{}", LOCAL_DB_DIR);
    info!(
        "No cloud config or SURREALDB_URL found, using local persistence: {}",
        url
    );
    open(&url, DEFAULT_NAMESPACE, DEFAULT_DATABASE).await
}

/// Connect to SurrealDB Cloud and authenticate.
pub async fn connect_cloud(config: &CloudConfig) -> Result<Surreal<Any>> {
    let db = surrealdb::engine::any::connect(&config.endpoint)
        .await
        .map_err(|e| StateError::Connection(e.to_string()))?;

    if config.is_root {
        db.signin(Root {
            username: &config.username,
            password: &config.password,
        })
        .await
        .map_err(|e| StateError::Connection(format!("Root auth failed: {e}")))?;
    } else {
        db.signin(Database {
            namespace: &config.namespace,
            database: &config.database,
            username: &config.username,
            password: &config.password,
        })
        .await
        .map_err(|e| StateError::Connection(format!("DB auth failed: {e}")))?;
    }

    db.use_ns(&config.namespace)
        .use_db(&config.database)
        .await
        .map_err(|e| StateError::Connection(e.to_string()))?;

    migrations::init_schema(&db).await?;
    info!("Registry database connected (cloud)");
    Ok(db)
}

async fn open(url: &str, namespace: &str, database: &str) -> Result<Surreal<Any>> {
    let db = surrealdb::engine::any::connect(url)
        .await
        .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

    db.use_ns(namespace)
        .use_db(database)
        .await
        .map_err(|e| StateError::Connection(e.to_string()))?;

    migrations::init_schema(&db).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_config_builders() {
        let config = CloudConfig::new("wss://db.example", "reader", "secret")
            .with_namespace("ihe")
            .with_database("xds_b")
            .with_root(true);
        assert_eq!(config.namespace, "ihe");
        assert_eq!(config.database, "xds_b");
        assert!(config.is_root);
    }

    #[test]
    fn test_cloud_config_defaults() {
        let config = CloudConfig::new("wss://db.example", "reader", "secret");
        assert_eq!(config.namespace, "xds");
        assert_eq!(config.database, "registry");
        assert!(!config.is_root);
    }
}
