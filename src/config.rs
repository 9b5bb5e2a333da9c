//! Runtime configuration.
//!
//! Loaded from TOML; every section and field is optional. Lookup order:
//! `--config <path>`, then `<config_dir>/mergington/config.toml`, then
//! built-in defaults. `MERGINGTON_HOST`, `MERGINGTON_PORT` and
//! `MERGINGTON_USERS_FILE` override the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub activities: ActivitiesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON document holding `{"users": [...]}`.
    pub users_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            users_file: PathBuf::from("users.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    /// PBKDF2 rounds for newly written hashes. Existing hashes keep theirs.
    pub password_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session_id".into(),
            password_iterations: crate::auth::password::DEFAULT_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActivitiesConfig {
    /// Reject signups once an activity reaches `max_participants`.
    pub enforce_capacity: bool,
}

impl Config {
    /// Load from `path` if given, else from the default location if a file
    /// exists there, else defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Apply `MERGINGTON_*` overrides from `lookup`. Unparseable values are
    /// ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("MERGINGTON_HOST").filter(|h| !h.trim().is_empty()) {
            self.gateway.host = host.trim().to_owned();
        }
        if let Some(port) = lookup("MERGINGTON_PORT") {
            match port.trim().parse() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!("Ignoring invalid MERGINGTON_PORT={port:?}"),
            }
        }
        if let Some(file) = lookup("MERGINGTON_USERS_FILE").filter(|f| !f.trim().is_empty()) {
            self.storage.users_file = PathBuf::from(file.trim());
        }
    }
}

/// `<config_dir>/mergington/config.toml` for the current user.
pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("edu", "Mergington", "mergington")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
