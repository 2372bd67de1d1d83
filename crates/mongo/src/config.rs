//! Connection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use rested_resource::error::{BackendError, StorageError, StorageResult};

use crate::BACKEND_NAME;

/// Configuration for the MongoDB handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Connection string (`mongodb://` or `mongodb+srv://`).
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database holding the collection.
    pub database: String,

    /// Collection storing the items.
    pub collection: String,

    /// Application name reported to the server.
    #[serde(default)]
    pub app_name: Option<String>,

    /// Timeout for establishing a connection.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Timeout for selecting a server for an operation.
    #[serde(with = "humantime_serde", default = "default_server_selection_timeout")]
    pub server_selection_timeout: Duration,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: "rested".to_string(),
            collection: "items".to_string(),
            app_name: None,
            connect_timeout: default_connect_timeout(),
            server_selection_timeout: default_server_selection_timeout(),
        }
    }
}

fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_server_selection_timeout() -> Duration {
    Duration::from_secs(30)
}

impl MongoConfig {
    /// Creates a configuration for `database.collection` with default connection settings.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// Sets the connection string.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    /// Validates configuration invariants.
    pub fn validate(&self) -> StorageResult<()> {
        let uri = self.uri.trim();
        if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
            return Err(invalid("uri must start with mongodb:// or mongodb+srv://"));
        }

        if self.database.trim().is_empty() {
            return Err(invalid("database must not be empty"));
        }

        if self.collection.trim().is_empty() {
            return Err(invalid("collection must not be empty"));
        }

        if self
            .app_name
            .as_ref()
            .map(|name| name.trim().is_empty())
            .unwrap_or(false)
        {
            return Err(invalid("app_name must not be empty when provided"));
        }

        if self.connect_timeout.is_zero() {
            return Err(invalid("connect_timeout must be > 0"));
        }

        if self.server_selection_timeout.is_zero() {
            return Err(invalid("server_selection_timeout must be > 0"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> StorageError {
    StorageError::Backend(BackendError::Configuration {
        backend_name: BACKEND_NAME.to_string(),
        message: message.to_string(),
    })
}

/// Serde module for Duration with humantime format.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
