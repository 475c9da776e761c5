//! Process-wide settings for dockhand
//!
//! Located at `~/.config/dockhand/config.toml`. Every field has a default so
//! the file is optional; environment variables win over file values.

use crate::{ConfigError, Result};
use directories::ProjectDirs;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Default number of container log lines attached to start failures
pub const DEFAULT_LOG_TAIL_LINES: usize = 50;

/// Top-level dockhand settings
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub services: ServiceSettings,
    pub runtime: RuntimeSettings,
    /// Credentials every API request must present via Basic auth
    pub auth: Credentials,
    /// Credentials used for `login` before pulling private images
    pub registry: RegistrySettings,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to bind, e.g. `0.0.0.0:8080`
    pub listen: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Service storage settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Directory holding one sub-directory per service.
    /// Falls back to the operator's home directory when unset.
    pub base_dir: Option<PathBuf>,
    /// Lines of container logs captured when a start fails
    pub log_tail_lines: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_dir: None,
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
        }
    }
}

/// Container runtime CLI settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Runtime binary ("docker" or a compatible CLI)
    pub command: String,
    /// Optional prefix, e.g. `["sudo"]` or `["flatpak-spawn", "--host"]`
    pub prefix: Vec<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            command: "docker".to_string(),
            prefix: Vec::new(),
        }
    }
}

/// A username/password pair. Either half may be missing until validated.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: Option<String>,
    #[serde(deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(SecretString::from(password.into())),
        }
    }

    /// Both halves present and non-empty
    pub fn is_complete(&self) -> bool {
        let has_user = self.username.as_deref().is_some_and(|u| !u.is_empty());
        let has_pass = self
            .password
            .as_ref()
            .is_some_and(|p| !p.expose_secret().is_empty());
        has_user && has_pass
    }
}

/// Private registry settings
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    #[serde(flatten)]
    pub credentials: Credentials,
    /// Registry host passed to `login`; Docker Hub when unset
    pub server: Option<String>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl Settings {
    /// Load settings from `path` (or the default location) and apply
    /// environment overrides. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) => Self::load_from(p)?,
            None => match Self::config_path() {
                Ok(p) => Self::load_from(&p)?,
                Err(_) => {
                    tracing::debug!("No config directory available, using defaults");
                    Self::default()
                }
            },
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Load settings from a specific file without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let settings: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        tracing::debug!("Loaded config from {:?}", path);
        Ok(settings)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("API_USERNAME") {
            self.auth.username = Some(v);
        }
        if let Some(v) = get("API_PASSWORD") {
            self.auth.password = Some(SecretString::from(v));
        }
        if let Some(v) = get("DOCKER_USERNAME") {
            self.registry.credentials.username = Some(v);
        }
        if let Some(v) = get("DOCKER_PASSWORD") {
            self.registry.credentials.password = Some(SecretString::from(v));
        }
        if let Some(v) = get("DOCKER_REGISTRY") {
            self.registry.server = Some(v);
        }
        if let Some(v) = get("DOCKHAND_BASE_DIR") {
            self.services.base_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("DOCKHAND_LISTEN") {
            self.server.listen = v;
        }
        if let Some(v) = get("DOCKHAND_RUNTIME") {
            self.runtime.command = v;
        }
    }

    /// Check the required field set: API credentials, a runtime command,
    /// a parseable listen address and a positive log tail.
    pub fn validate(&self) -> Result<()> {
        if self.auth.username.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing("API_USERNAME"));
        }
        if self
            .auth
            .password
            .as_ref()
            .map_or(true, |p| p.expose_secret().is_empty())
        {
            return Err(ConfigError::Missing("API_PASSWORD"));
        }
        if self.runtime.command.trim().is_empty() {
            return Err(ConfigError::Invalid("runtime.command must not be empty".into()));
        }
        if self.services.log_tail_lines == 0 {
            return Err(ConfigError::Invalid(
                "services.log_tail_lines must be greater than zero".into(),
            ));
        }
        self.listen_addr()?;
        Ok(())
    }

    /// Parsed listen address
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server.listen.parse().map_err(|_| {
            ConfigError::Invalid(format!("invalid listen address '{}'", self.server.listen))
        })
    }

    /// Resolved service base directory
    pub fn base_dir(&self) -> Result<PathBuf> {
        match &self.services.base_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir().ok_or(ConfigError::NoHomeDir),
        }
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "dockhand").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}
