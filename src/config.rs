//! Configuration manager for the identity service.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides `token.secret`.
pub const SECRET_KEY_ENV: &str = "SECRET_KEY";
/// Overrides `database.address`.
pub const MONGO_URI_ENV: &str = "MONGO_URI";
/// Overrides `port`.
pub const PORT_ENV: &str = "PORT";
/// Overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Listening port.
    pub port: u16,
    /// Deadline applied to every request.
    pub request_timeout_secs: u64,
    /// Expose Prometheus metrics on `/metrics`.
    pub metrics: bool,
    version: String,
    /// Related to JsonWebToken configuration.
    #[serde(skip_serializing)]
    pub token: Option<Token>,
    /// Related to user store configuration.
    #[serde(skip_serializing)]
    pub database: Database,
    /// Related to Argon2 configuration.
    #[serde(skip_serializing)]
    pub argon2: Option<Argon2>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: env!("CARGO_CRATE_NAME").to_owned(),
            port: 8080,
            request_timeout_secs: 10,
            metrics: false,
            version: VERSION.to_owned(),
            token: None,
            database: Database::default(),
            argon2: None,
        }
    }
}

/// Which [`crate::user::UserStore`] backs the service.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Mongo,
    Memory,
}

/// User store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    pub backend: Backend,
    /// MongoDB connection string.
    pub address: String,
    /// Database name.
    pub name: String,
    /// Upper bound on a liveness ping.
    pub health_timeout_secs: u64,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            backend: Backend::Mongo,
            address: "mongodb://localhost:27017".to_owned(),
            name: "mywallet".to_owned(),
            health_timeout_secs: 10,
        }
    }
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2 {
    /// Memory used while hashing.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
    /// Output hash length.
    pub hash_length: usize,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 64, // 64 MiB.
            iterations: 4,
            parallelism: 2,
            hash_length: 32,
        }
    }
}

#[cfg(test)]
impl Argon2 {
    /// Cheapest valid parameters.
    pub fn fast() -> Self {
        Self {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        }
    }
}

/// Json Web Token configuration.
#[derive(Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Token {
    /// HS256 shared secret.
    pub secret: Option<String>,
    /// Access token lifetime. Default is 30 minutes.
    pub access_expiration_minutes: Option<u64>,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("access_expiration_minutes", &self.access_expiration_minutes)
            .finish()
    }
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    /// Current crate version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Reads the `config.yaml` file from `CONFIG_PATH` or the default
    /// location, then applies environment overrides.
    pub fn read(self) -> Arc<Self> {
        let file_path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        Arc::new(self.load(&file_path).env(|key| std::env::var(key).ok()))
    }

    /// Parse the file at `path`, falling back to defaults.
    fn load(&self, path: &Path) -> Self {
        match File::open(path) {
            Ok(file) => match serde_yaml::from_reader::<_, Configuration>(file)
            {
                Ok(config) => Self {
                    version: VERSION.to_owned(),
                    ..config
                },
                Err(err) => self.error(err),
            },
            Err(err) => self.error(err),
        }
    }

    /// Apply environment overrides looked up through `lookup`.
    pub fn env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(SECRET_KEY_ENV) {
            self.token.get_or_insert_with(Token::default).secret = Some(secret);
        }

        if let Some(address) = lookup(MONGO_URI_ENV) {
            self.database.address = address;
        }

        if let Some(port) = lookup(PORT_ENV) {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(err) => {
                    tracing::warn!(%port, error = %err, "ignoring invalid `PORT`")
                },
            }
        }

        self
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found");
        Self {
            version: VERSION.to_owned(),
            ..Default::default()
        }
    }
}
