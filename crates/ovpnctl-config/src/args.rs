//! Ordered argument list for the supervised VPN daemon.
//!
//! Keys are given without the leading `--`. Values are split on whitespace
//! into separate argv entries, so `set("management", "/run/mgmt.sock unix")`
//! yields `["--management", "/run/mgmt.sock", "unix"]`.

use crate::{ManagementConfig, ProcessConfig, split_host_port};

/// Flat key/value builder for the daemon's command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonArgs {
    params: Vec<String>,
}

impl DaemonArgs {
    /// Create an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the management flags for a daemon that dials back to ovpnctl.
    ///
    /// The daemon is always started with `--management-client`, so the
    /// management endpoint is the one ovpnctl listens on in server mode.
    pub fn for_management(mgmt: &ManagementConfig) -> Self {
        let mut args = Self::new();
        args.flag("management-signal")
            .flag("management-up-down")
            .flag("management-client");

        if let Some(path) = mgmt.socket_path() {
            args.set("management", &format!("{path} unix"));
        } else if let Some(addr) = mgmt.tcp_address() {
            match split_host_port(addr) {
                Some((host, port)) => args.set("management", &format!("{host} {port}")),
                None => args.set("management", addr),
            };
        }
        args
    }

    /// Append `--key` followed by each whitespace-separated part of `value`.
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        self.params.push(format!("--{key}"));
        self.params
            .extend(value.split_whitespace().map(str::to_string));
        self
    }

    /// Append a bare `--key` flag.
    pub fn flag(&mut self, key: &str) -> &mut Self {
        self.params.push(format!("--{key}"));
        self
    }

    /// Append raw argv entries verbatim.
    pub fn extend<I, S>(&mut self, raw: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.extend(raw.into_iter().map(Into::into));
        self
    }

    /// Whether `--key` has been added.
    pub fn contains(&self, key: &str) -> bool {
        let wanted = format!("--{key}");
        self.params.iter().any(|p| *p == wanted)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The argv entries built so far.
    pub fn as_slice(&self) -> &[String] {
        &self.params
    }

    /// Consume the builder and return the argv.
    pub fn finalize(self) -> Vec<String> {
        self.params
    }
}

impl ProcessConfig {
    /// Management flags for `mgmt` followed by `extra_args`.
    pub fn build_args(&self, mgmt: &ManagementConfig) -> DaemonArgs {
        let mut args = DaemonArgs::for_management(mgmt);
        args.extend(self.extra_args.iter().cloned());
        args
    }
}
