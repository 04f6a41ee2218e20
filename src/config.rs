use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::constants::DEFAULT_CHUNK_SIZE;

fn default_listen_host() -> String {
    "::".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

/// Service configuration file structure
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Externally reachable base URL embedded in retrieval URLs (e.g. http://localhost:3000)
    pub public_url: String,
    /// Address to bind (default: "::", IPv4 + IPv6)
    #[serde(default = "default_listen_host")]
    pub listen_host: String,
    /// Port to listen on (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Download chunk size in bytes (default: 4096)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Largest accepted upload request body in bytes (default: 100 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// SQLite storage (maps to [sqlite] section in TOML)
    pub sqlite: Option<SqliteConfig>,
    /// PostgreSQL storage (maps to [postgres] section in TOML)
    pub postgres: Option<PostgresConfig>,
}

/// SQLite storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteConfig {
    /// Database file, created if missing
    pub path: PathBuf,
}

/// PostgreSQL storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    /// Base URL without password or database (e.g. postgres://user@host:5432)
    pub url: String,
    /// Database name, created if missing
    pub database: String,
    /// Credential profile name to look up the password from ~/.config/wav_vault/credentials.toml
    pub credential_profile: String,
}

/// Which store the service runs against
#[derive(Debug, Clone)]
pub enum StorageConfig<'a> {
    Sqlite(&'a SqliteConfig),
    Postgres(&'a PostgresConfig),
}

impl ServiceConfig {
    /// Validate the configuration
    ///
    /// Exactly one of `[sqlite]` / `[postgres]` must be present, `public_url`
    /// must be an absolute http(s) URL and `chunk_size` must be positive.
    pub fn validate(&self) -> Result<(), String> {
        self.public_url()?;

        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }

        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }

        self.storage()?;

        Ok(())
    }

    /// Parsed `public_url`
    pub fn public_url(&self) -> Result<Url, String> {
        let url = Url::parse(&self.public_url)
            .map_err(|e| format!("Invalid public_url '{}': {}", self.public_url, e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(format!(
                "public_url must use http or https, got '{}'",
                url.scheme()
            ));
        }
        if url.query().is_some() {
            return Err("public_url must not carry a query string".to_string());
        }
        Ok(url)
    }

    /// The configured storage backend
    pub fn storage(&self) -> Result<StorageConfig<'_>, String> {
        match (&self.sqlite, &self.postgres) {
            (Some(sqlite), None) => Ok(StorageConfig::Sqlite(sqlite)),
            (None, Some(postgres)) => Ok(StorageConfig::Postgres(postgres)),
            (Some(_), Some(_)) => {
                Err("Only one of [sqlite] and [postgres] may be configured".to_string())
            }
            (None, None) => Err("Either a [sqlite] or a [postgres] section is required".to_string()),
        }
    }
}

/// Load and validate a config file
pub fn load_config(config_path: &Path) -> Result<ServiceConfig, String> {
    let config_content = std::fs::read_to_string(config_path).map_err(|e| {
        format!(
            "Failed to read config file '{}': {}",
            config_path.display(),
            e
        )
    })?;
    let config: ServiceConfig = toml::from_str(&config_content).map_err(|e| {
        format!(
            "Failed to parse config file '{}': {}",
            config_path.display(),
            e
        )
    })?;
    config.validate()?;
    Ok(config)
}
