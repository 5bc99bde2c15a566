//! Configuration loading.
//!
//! Configuration is a single YAML file discovered in order: an explicit
//! `--config` path, the `DELIVERY_BOARD_CONFIG` environment variable, the
//! project-level `delivery-board/config.yaml`, then the user-level
//! `~/.delivery-board/config.yaml`. Missing files fall back to defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default port the API listens on.
pub const DEFAULT_PORT: u16 = 3001;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on (default: 3001).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            db_path: default_db_path(),
        }
    }
}

/// CORS settings. Origins not in the list are rejected by the browser
/// preflight; credentials stay enabled, so a wildcard is never used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Admin allow-list settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Seed allow-list, always included alongside the admin_access table.
    #[serde(default)]
    pub emails: Vec<String>,

    /// Seconds before a cached allow-list snapshot is refreshed (default: 300).
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            emails: Vec::new(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_path() -> PathBuf {
    PathBuf::from("delivery-board/board.db")
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
    ]
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl Config {
    /// Load configuration, walking the discovery order.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var("DELIVERY_BOARD_CONFIG") {
            return Self::from_file(Path::new(&path));
        }
        let project = Path::new("delivery-board").join("config.yaml");
        if project.exists() {
            return Self::from_file(&project);
        }
        if let Some(home) = dirs::home_dir() {
            let user = home.join(".delivery-board").join("config.yaml");
            if user.exists() {
                return Self::from_file(&user);
            }
        }
        Ok(Self::default())
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Create the database parent directory if needed.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.admin.cache_ttl_secs, 300);
        assert!(config.admin.emails.is_empty());
        assert_eq!(config.cors.allowed_origins.len(), 2);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str(
            "server:\n  port: 8080\nadmin:\n  emails:\n    - ops@example.com\n",
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.db_path, default_db_path());
        assert_eq!(config.admin.emails, vec!["ops@example.com"]);
        assert_eq!(config.admin.cache_ttl_secs, 300);
    }

    #[test]
    fn from_file_reads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "cors:\n  allowed_origins:\n    - https://ui.example.com\n")
            .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.cors.allowed_origins, vec!["https://ui.example.com"]);
    }
}
