//! Configuration loading
//!
//! Resolution order (highest priority first):
//! 1. Command-line flags (applied by the server binary)
//! 2. Environment variables (`SHIPYARD_*`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing config file is not an error; defaults are used and a warning is
//! logged.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5780";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
/// Ten years
pub const MAX_INVITATION_TTL_HOURS: u32 = 87_600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub auth: AuthSection,
    pub invitations: InvitationSection,
    pub github: GitHubSection,
    pub slack: SlackSection,
    pub email: EmailSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind_addr: String,
    /// Base URL of the web frontend, used to build invitation links
    pub public_base_url: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            default_page_size: 25,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SQLite file; defaults to `<data dir>/shipyard/shipyard.db`
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// HS256 secret shared with the auth provider
    pub jwt_secret: String,
    /// Expected `aud` claim; unchecked when unset
    pub audience: Option<String>,
    /// Emails promoted to admin on login
    pub admin_emails: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvitationSection {
    pub ttl_hours: u32,
}

impl Default for InvitationSection {
    fn default() -> Self {
        Self { ttl_hours: 168 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
    /// GitHub sync is disabled without a token
    pub token: Option<String>,
    pub api_base_url: String,
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            token: None,
            api_base_url: DEFAULT_GITHUB_API.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackSection {
    /// Used for projects that have no webhook of their own
    pub default_webhook_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSection {
    /// Email is disabled unless both URL and key are set
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
    pub from_address: String,
}

impl Default for EmailSection {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_key: None,
            from_address: "Shipyard <noreply@shipyard.local>".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default tracing filter when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "shipyard_server=info,tower_http=info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load from an explicit file, or from the platform default location
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file falls back to compiled defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
            })?;
            info!("Loaded configuration from {}", path.display());
            return Self::from_toml_str(&content);
        }

        match default_config_path() {
            Some(path) => {
                let content = std::fs::read_to_string(&path)?;
                info!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&content)
            }
            None => {
                warn!("No config file found, using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply `SHIPYARD_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the environment in production)
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SHIPYARD_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = get("SHIPYARD_PUBLIC_BASE_URL") {
            self.server.public_base_url = v;
        }
        if let Some(v) = get("SHIPYARD_DATABASE_PATH") {
            self.database.path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("SHIPYARD_JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Some(v) = get("SHIPYARD_JWT_AUDIENCE") {
            self.auth.audience = Some(v);
        }
        if let Some(v) = get("SHIPYARD_ADMIN_EMAILS") {
            self.auth.admin_emails = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = get("SHIPYARD_GITHUB_TOKEN") {
            self.github.token = Some(v);
        }
        if let Some(v) = get("SHIPYARD_SLACK_WEBHOOK_URL") {
            self.slack.default_webhook_url = Some(v);
        }
        if let Some(v) = get("SHIPYARD_EMAIL_API_URL") {
            self.email.api_base_url = Some(v);
        }
        if let Some(v) = get("SHIPYARD_EMAIL_API_KEY") {
            self.email.api_key = Some(v);
        }
        if let Some(v) = get("SHIPYARD_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(Error::Config(
                "auth.jwt_secret is required (or set SHIPYARD_JWT_SECRET)".to_string(),
            ));
        }
        self.bind_addr()?;
        if self.invitations.ttl_hours == 0 {
            return Err(Error::Config("invitations.ttl_hours must be > 0".to_string()));
        }
        if self.invitations.ttl_hours > MAX_INVITATION_TTL_HOURS {
            return Err(Error::Config(format!(
                "invitations.ttl_hours must be at most {}",
                MAX_INVITATION_TTL_HOURS
            )));
        }
        if self.server.max_page_size == 0 || self.server.default_page_size == 0 {
            return Err(Error::Config("Page sizes must be > 0".to_string()));
        }
        if self.server.default_page_size > self.server.max_page_size {
            return Err(Error::Config(
                "server.default_page_size exceeds server.max_page_size".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind_addr.parse().map_err(|e| {
            Error::Config(format!("Invalid bind address '{}': {}", self.server.bind_addr, e))
        })
    }

    /// Configured database file, or the platform default
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(default_database_path)
    }

    /// Admin bootstrap list, normalized for comparison
    pub fn admin_emails(&self) -> Vec<String> {
        self.auth
            .admin_emails
            .iter()
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }
}

/// First existing config file: `~/.config/shipyard/config.toml`, then
/// `/etc/shipyard/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("shipyard").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/shipyard/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("shipyard"))
        .unwrap_or_else(|| PathBuf::from("./shipyard_data"))
        .join("shipyard.db")
}
