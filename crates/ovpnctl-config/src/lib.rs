#![deny(unsafe_code)]

//! Configuration loading and validation for ovpnctl.
//!
//! Loads TOML configuration files and validates them against expected schemas.
//! Provides the [`AppConfig`] type as the central configuration structure,
//! and the [`args`] module for building the supervised daemon's argument list.

/// Flat key/value builder for the daemon's command line.
pub mod args;

pub use args::DaemonArgs;

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Management interface transport and mode.
    #[serde(default)]
    pub management: ManagementConfig,

    /// Supervised daemon process.
    #[serde(default)]
    pub process: ProcessConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Management interface configuration.
///
/// A non-empty `socket` selects the Unix transport and takes precedence over
/// `address`; otherwise `address` is used over TCP. In `server`
/// mode ovpnctl listens on the endpoint and the daemon dials in
/// (`--management-client`); in `client` mode ovpnctl dials the daemon.
///
/// ## TOML Example
///
/// ```toml
/// [management]
/// mode = "server"
/// socket = "/run/ovpnctl/mgmt.sock"
/// command_queue = 10
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagementConfig {
    /// Connection mode: "server" (listen) or "client" (dial).
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Unix domain socket path.
    #[serde(default)]
    pub socket: Option<String>,

    /// TCP `host:port` address, used when no socket is configured.
    #[serde(default = "default_address")]
    pub address: String,

    /// Capacity of the outbound command queue used in server mode.
    #[serde(default = "default_command_queue")]
    pub command_queue: usize,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            socket: None,
            address: default_address(),
            command_queue: default_command_queue(),
        }
    }
}

impl ManagementConfig {
    /// Whether ovpnctl listens for the daemon rather than dialing it.
    pub fn is_server(&self) -> bool {
        self.mode == "server"
    }

    /// The configured Unix socket path, ignoring empty strings.
    pub fn socket_path(&self) -> Option<&str> {
        self.socket.as_deref().filter(|s| !s.is_empty())
    }

    /// The TCP address, or `None` when a socket path takes precedence.
    pub fn tcp_address(&self) -> Option<&str> {
        match self.socket_path() {
            Some(_) => None,
            None => Some(self.address.as_str()),
        }
    }
}

fn default_mode() -> String {
    "client".to_string()
}

fn default_address() -> String {
    "127.0.0.1:7505".to_string()
}

fn default_command_queue() -> usize {
    10
}

/// Supervised daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Executable name or path of the VPN daemon.
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Additional arguments appended after the management flags.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Capacity of each stdout/stderr line channel.
    #[serde(default = "default_output_buffer")]
    pub output_buffer: usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            extra_args: Vec::new(),
            output_buffer: default_output_buffer(),
        }
    }
}

fn default_binary() -> String {
    "openvpn".to_string()
}

fn default_output_buffer() -> usize {
    64
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        debug!(path = %path.display(), bytes = content.len(), "loaded config file");
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mgmt = &self.management;
        let valid_modes = ["server", "client"];
        if !valid_modes.contains(&mgmt.mode.as_str()) {
            return Err(ConfigError::Validation(format!(
                "management.mode must be one of {:?}, got {:?}",
                valid_modes, mgmt.mode
            )));
        }
        if let Some(addr) = mgmt.tcp_address() {
            if addr.parse::<SocketAddr>().is_err() && split_host_port(addr).is_none() {
                return Err(ConfigError::Validation(format!(
                    "management.address must be host:port, got {addr:?}"
                )));
            }
        }
        if mgmt.command_queue == 0 {
            return Err(ConfigError::Validation(
                "management.command_queue must be at least 1".to_string(),
            ));
        }

        if self.process.binary.trim().is_empty() {
            return Err(ConfigError::Validation(
                "process.binary must not be empty".to_string(),
            ));
        }
        if self.process.output_buffer == 0 {
            return Err(ConfigError::Validation(
                "process.output_buffer must be at least 1".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}

/// Split a `host:port` string on its last colon, requiring a numeric port.
pub fn split_host_port(addr: &str) -> Option<(&str, u16)> {
    let (host, port) = addr.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    let port = port.parse().ok()?;
    Some((host, port))
}
