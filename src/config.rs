//! # Configuration Management
//!
//! Centralized configuration for the Votifier client.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment variables via `from_env()`
//!
//! ## Example
//! ```toml
//! [server]
//! host = "mc.example.org"
//! port = 8192
//! protocol = "v2"
//! token = "7j302r4n..."
//!
//! [transport]
//! connect_timeout = 5000
//! ```

use crate::core::server::{ProtocolVersion, ServerIdentity, ServerKind};
use crate::error::{constants, ProtocolError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

/// Port the Votifier plugins listen on out of the box
pub const DEFAULT_PORT: u16 = 8192;

/// Bytes read for the greeting
pub const GREETING_LIMIT: usize = 64;

/// Bytes read for the v2 acknowledgment
pub const RESPONSE_LIMIT: usize = 256;

/// Smallest accepted read limit
const MIN_READ_LIMIT: usize = 16;

/// Main client configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ClientConfig {
    /// Target server
    #[serde(default)]
    pub server: ServerConfig,

    /// Timeouts and read limits
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup on top of the defaults
    pub(crate) fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("VOTIFIER_HOST") {
            config.server.host = host;
        }

        if let Some(port) = lookup("VOTIFIER_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ProtocolError::ConfigError(format!("Invalid VOTIFIER_PORT: {port}")))?;
        }

        if let Some(protocol) = lookup("VOTIFIER_PROTOCOL") {
            config.server.protocol = match protocol.to_ascii_lowercase().as_str() {
                "v1" | "1" => ProtocolVersion::V1,
                "v2" | "2" => ProtocolVersion::V2,
                other => {
                    return Err(ProtocolError::ConfigError(format!(
                        "Invalid VOTIFIER_PROTOCOL: {other}"
                    )))
                }
            };
        }

        if let Some(token) = lookup("VOTIFIER_TOKEN") {
            config.server.token = Some(token);
        }

        if let Some(key) = lookup("VOTIFIER_PUBLIC_KEY") {
            config.server.public_key = Some(key);
        }

        if let Some(timeout) = lookup("VOTIFIER_CONNECT_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.transport.connect_timeout = Duration::from_millis(val);
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.transport.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Target server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host name or IP address
    pub host: String,

    /// Votifier port
    pub port: u16,

    /// Protocol to speak
    #[serde(default)]
    pub protocol: ProtocolVersion,

    /// Plugin running on the server
    #[serde(default)]
    pub kind: ServerKind,

    /// RSA public key (v1), PEM or bare base64
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    /// File holding the RSA public key (v1); used when `public_key` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_file: Option<PathBuf>,

    /// Shared token (v2)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: DEFAULT_PORT,
            protocol: ProtocolVersion::V2,
            kind: ServerKind::NuVotifier,
            public_key: None,
            public_key_file: None,
            token: None,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.host.trim().is_empty() {
            errors.push("Server host cannot be empty".to_string());
        }

        if self.port == 0 {
            errors.push("Server port cannot be 0".to_string());
        }

        match self.protocol {
            ProtocolVersion::V1 => {
                let inline = self.public_key.as_deref().is_some_and(|k| !k.trim().is_empty());
                if !inline && self.public_key_file.is_none() {
                    errors.push(constants::ERR_MISSING_PUBLIC_KEY.to_string());
                }
            }
            ProtocolVersion::V2 => {
                if self.token.as_deref().map_or(true, str::is_empty) {
                    errors.push(constants::ERR_MISSING_TOKEN.to_string());
                }
                if self.kind == ServerKind::Classic {
                    errors.push(constants::ERR_CLASSIC_V2.to_string());
                }
            }
        }

        errors
    }

    /// Resolve into a `ServerIdentity`, reading the key file if needed
    pub fn identity(&self) -> Result<ServerIdentity> {
        let identity = match self.protocol {
            ProtocolVersion::V1 => {
                let key = match (&self.public_key, &self.public_key_file) {
                    (Some(key), _) => key.clone(),
                    (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                        ProtocolError::ConfigError(format!(
                            "Failed to read public key file {}: {e}",
                            path.display()
                        ))
                    })?,
                    (None, None) => {
                        return Err(ProtocolError::ConfigError(
                            constants::ERR_MISSING_PUBLIC_KEY.into(),
                        ))
                    }
                };
                ServerIdentity::v1(self.host.clone(), self.port, key)
            }
            ProtocolVersion::V2 => {
                let token = self.token.clone().ok_or_else(|| {
                    ProtocolError::ConfigError(constants::ERR_MISSING_TOKEN.into())
                })?;
                ServerIdentity::v2(self.host.clone(), self.port, token)
            }
        };

        let identity = identity.with_kind(self.kind);
        identity.validate()?;
        Ok(identity)
    }
}

/// Timeouts and read limits for one vote connection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Time allowed for the TCP connect
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Time allowed for the greeting (v2)
    #[serde(with = "duration_serde")]
    pub greeting_timeout: Duration,

    /// Time allowed for the acknowledgment (v2)
    #[serde(with = "duration_serde")]
    pub response_timeout: Duration,

    /// Maximum greeting bytes read
    pub greeting_limit: usize,

    /// Maximum acknowledgment bytes read
    pub response_limit: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: timeout::CONNECT_TIMEOUT,
            greeting_timeout: timeout::GREETING_TIMEOUT,
            response_timeout: timeout::RESPONSE_TIMEOUT,
            greeting_limit: GREETING_LIMIT,
            response_limit: RESPONSE_LIMIT,
        }
    }
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("Connect timeout", self.connect_timeout),
            ("Greeting timeout", self.greeting_timeout),
            ("Response timeout", self.response_timeout),
        ] {
            if value.is_zero() {
                errors.push(format!("{name} cannot be 0"));
            } else if value > timeout::MAX_TIMEOUT {
                errors.push(format!(
                    "{name} too long: {}ms (maximum: {}ms)",
                    value.as_millis(),
                    timeout::MAX_TIMEOUT.as_millis()
                ));
            }
        }

        if self.greeting_limit < MIN_READ_LIMIT {
            errors.push(format!(
                "Greeting limit too small: {} bytes (minimum: {MIN_READ_LIMIT})",
                self.greeting_limit
            ));
        }

        if self.response_limit < MIN_READ_LIMIT {
            errors.push(format!(
                "Response limit too small: {} bytes (minimum: {MIN_READ_LIMIT})",
                self.response_limit
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("votifier-client"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
