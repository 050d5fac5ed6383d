//! Client configuration loaded from TOML.
//!
//! The default location is `~/.config/proxlock/config.toml` (or the platform
//! equivalent).
//!
//! ## Example Configuration
//!
//! ```toml
//! partial_key = "pk_abc"
//! association_id = "assoc_1"
//!
//! [attestation]
//! environment = "restricted"
//! bypass_env = "PROXLOCK_DEVICE_CHECK_BYPASS"
//!
//! [http]
//! endpoint = "https://api.proxlock.dev/proxy"
//! timeout_seconds = 60
//! connect_timeout_seconds = 30
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::headers::{DEVICE_CHECK_BYPASS_ENV, PROXY_ENDPOINT};
use crate::session::SessionContext;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// No configuration directory exists on this platform.
    #[error("Failed to determine config directory")]
    NoConfigDir,

    /// A value failed validation.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias using `ConfigError`.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Where the application is running, which decides how attestation works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionEnvironment {
    /// Real hardware that may support device attestation.
    Device,
    /// Simulator, emulator or CI host. Attestation hardware is never
    /// available and a developer bypass value is used instead.
    #[default]
    Restricted,
}

impl fmt::Display for ExecutionEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device => write!(f, "device"),
            Self::Restricted => write!(f, "restricted"),
        }
    }
}

/// Attestation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationSettings {
    /// Execution environment (default: `restricted`).
    #[serde(default)]
    pub environment: ExecutionEnvironment,

    /// Environment variable holding the bypass value in restricted
    /// environments (default: `PROXLOCK_DEVICE_CHECK_BYPASS`).
    #[serde(default = "default_bypass_env")]
    pub bypass_env: String,
}

impl Default for AttestationSettings {
    fn default() -> Self {
        Self {
            environment: ExecutionEnvironment::default(),
            bypass_env: default_bypass_env(),
        }
    }
}

fn default_bypass_env() -> String {
    DEVICE_CHECK_BYPASS_ENV.to_string()
}

/// HTTP transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Proxy endpoint (default: `https://api.proxlock.dev/proxy`).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Total request timeout in seconds (default: 60).
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connection timeout in seconds (default: 30).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    PROXY_ENDPOINT.to_string()
}

const fn default_timeout() -> u64 {
    60
}

const fn default_connect_timeout() -> u64 {
    30
}

impl HttpSettings {
    /// Total request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Connection timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Parses and checks the endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an absolute `http`/`https` URL.
    pub fn endpoint_url(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint).map_err(|e| {
            ConfigError::Invalid(format!("endpoint '{}' is not a URL: {e}", self.endpoint))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "endpoint '{}' must use http or https",
                self.endpoint
            )));
        }

        Ok(url)
    }

    /// Validates timeouts and the endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if a timeout is zero or the endpoint is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.connect_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        self.endpoint_url().map(|_| ())
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxLockConfig {
    /// Integration identity.
    #[serde(flatten)]
    pub session: SessionContext,

    /// Attestation settings.
    #[serde(default)]
    pub attestation: AttestationSettings,

    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpSettings,
}

impl ProxLockConfig {
    /// Creates a configuration with default attestation and HTTP settings.
    #[must_use]
    pub fn new(session: SessionContext) -> Self {
        Self {
            session,
            attestation: AttestationSettings::default(),
            http: HttpSettings::default(),
        }
    }

    /// Loads configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config directory cannot be determined
    /// - The file cannot be read
    /// - Deserialization or validation fails
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Loads and validates configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&contents)?;
        debug!("Loaded ProxLock configuration from {}", path.display());
        Ok(config)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("proxlock");

        Ok(config_dir.join("config.toml"))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The partial key or association ID is empty
    /// - The bypass variable name is empty
    /// - The HTTP settings are invalid
    pub fn validate(&self) -> Result<()> {
        if self.session.partial_key().trim().is_empty() {
            return Err(ConfigError::Invalid("partial_key must not be empty".to_string()));
        }
        if self.session.association_id().trim().is_empty() {
            return Err(ConfigError::Invalid(
                "association_id must not be empty".to_string(),
            ));
        }
        if self.attestation.bypass_env.trim().is_empty() {
            return Err(ConfigError::Invalid("bypass_env must not be empty".to_string()));
        }
        self.http.validate()
    }
}
