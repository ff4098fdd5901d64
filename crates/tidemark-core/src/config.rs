//! Connection configuration.
//!
//! Settings come from `<root>/database.json` when present, layered with
//! `TIDEMARK_*` environment variables; CLI flags override both. The struct
//! is built once at startup and passed by reference into core — nothing in
//! core reads ambient state.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Config file looked up under the project root.
pub const CONFIG_FILE: &str = "database.json";

/// Default database host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default PostgreSQL port.
pub const DEFAULT_PORT: u16 = 5432;

/// Default user.
pub const DEFAULT_USER: &str = "admin";

/// Default database name.
pub const DEFAULT_DB: &str = "test";

/// Default connection/acquire timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Database connection settings.
///
/// `discovery` and `auth_key` are accepted for config-file compatibility
/// with older deployments; the PostgreSQL backend ignores them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// User to connect as.
    pub user: String,
    /// Password for the user.
    pub password: String,
    /// Target database name.
    pub db: String,
    /// Legacy driver option; ignored.
    pub discovery: bool,
    /// Connection/acquire timeout in seconds.
    pub timeout: u64,
    /// Legacy driver option; ignored.
    #[serde(rename = "authKey")]
    pub auth_key: String,
    /// Require TLS for the connection.
    pub ssl: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            db: DEFAULT_DB.to_string(),
            discovery: false,
            timeout: DEFAULT_TIMEOUT_SECS,
            auth_key: String::new(),
            ssl: false,
        }
    }
}

impl Config {
    /// Load configuration for a project root.
    ///
    /// Reads `database.json` when it exists (defaults otherwise), then
    /// applies `TIDEMARK_*` environment overrides.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| Error::Filesystem {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|e| Error::Config {
                reason: format!("{}: {e}", path.display()),
            })?
        } else {
            Self::default()
        };

        config.apply_env()?;
        Ok(config)
    }

    /// Apply `TIDEMARK_*` environment variable overrides.
    fn apply_env(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("TIDEMARK_HOST") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("TIDEMARK_PORT") {
            self.port = port.parse().map_err(|_| Error::Config {
                reason: format!("TIDEMARK_PORT is not a valid port: {port}"),
            })?;
        }
        if let Ok(user) = std::env::var("TIDEMARK_USER") {
            self.user = user;
        }
        if let Ok(password) = std::env::var("TIDEMARK_PASSWORD") {
            self.password = password;
        }
        if let Ok(db) = std::env::var("TIDEMARK_DB") {
            self.db = db;
        }
        Ok(())
    }

    /// Set the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the target database name.
    pub fn with_db(mut self, db: impl Into<String>) -> Self {
        self.db = db.into();
        self
    }

    /// Set the timeout in seconds.
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Require TLS.
    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }
}
