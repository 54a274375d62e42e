//! Configuration builders for tests.
//!
//! [`TestConfigBuilder`] produces [`AppConfig`] values in code;
//! [`TestConfigFile`] writes TOML into a temp directory for the async loader.

use std::path::{Path, PathBuf};

use ovpnctl_config::AppConfig;
use tempfile::TempDir;

/// Fluent builder for [`AppConfig`] in tests.
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .server_mode()
///     .socket("/tmp/t/mgmt.sock")
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn server_mode(mut self) -> Self {
        self.config.management.mode = "server".to_string();
        self
    }

    pub fn client_mode(mut self) -> Self {
        self.config.management.mode = "client".to_string();
        self
    }

    pub fn socket(mut self, path: impl AsRef<Path>) -> Self {
        self.config.management.socket = Some(path.as_ref().display().to_string());
        self
    }

    pub fn address(mut self, addr: &str) -> Self {
        self.config.management.socket = None;
        self.config.management.address = addr.to_string();
        self
    }

    pub fn command_queue(mut self, capacity: usize) -> Self {
        self.config.management.command_queue = capacity;
        self
    }

    pub fn binary(mut self, binary: &str) -> Self {
        self.config.process.binary = binary.to_string();
        self
    }

    pub fn extra_args(mut self, args: &[&str]) -> Self {
        self.config.process.extra_args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn output_buffer(mut self, capacity: usize) -> Self {
        self.config.process.output_buffer = capacity;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A TOML config file in an owned temp directory, removed on drop.
pub struct TestConfigFile {
    pub path: PathBuf,
    dir: TempDir,
}

impl TestConfigFile {
    pub async fn with_toml(toml_content: &str) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path = dir.path().join("ovpnctl.toml");
        tokio::fs::write(&path, toml_content)
            .await
            .expect("failed to write test config");
        Self { path, dir }
    }

    /// Load the file through [`AppConfig::load`].
    pub async fn load(&self) -> AppConfig {
        AppConfig::load(&self.path)
            .await
            .expect("failed to parse test config")
    }

    /// The temp directory, for placing sockets next to the config.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}
