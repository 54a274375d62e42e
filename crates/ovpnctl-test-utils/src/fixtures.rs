//! Canonical protocol transcripts.

use std::path::PathBuf;

use tempfile::TempDir;

/// Reply to `status 1` with a single connected client.
pub const STATUS_REPORT: &[&str] = &[
    "OpenVPN CLIENT LIST",
    "Updated,Thu Feb 13 23:39:20 2014",
    "Common Name,Real Address,Bytes Received,Bytes Sent,Connected Since",
    "VPN_client,10.13.156.4:1194,12563,14885,Thu Feb 13 23:39:20 2014",
    "ROUTING TABLE",
    "Virtual Address,Common Name,Real Address,Last Ref",
    "192.168.11.4,VPN_client,10.13.156.4:1194,Thu Feb 13 23:39:20 2014",
    "GLOBAL STATS",
    "Max bcast/mcast queue length,0",
    "END",
];

/// Realtime lines announcing a client whose certificate CN is `alice`.
pub const CLIENT_CONNECT: &[&str] = &[
    ">CLIENT:CONNECT,0,1",
    ">CLIENT:ENV,untrusted_ip=10.13.156.4",
    ">CLIENT:ENV,X509_0_CN=alice",
    ">CLIENT:ENV,END",
];

/// Realtime lines for the same client once established.
pub const CLIENT_ESTABLISHED: &[&str] = &[
    ">CLIENT:ESTABLISHED,0",
    ">CLIENT:ENV,X509_0_CN=alice",
    ">CLIENT:ENV,ifconfig_pool_remote_ip=10.8.0.6",
    ">CLIENT:ENV,END",
];

/// Greeting the daemon prints on every new management connection.
pub const GREETING: &str = ">INFO:OpenVPN Management Interface Version 3 -- type 'help' for more info";

/// [`STATUS_REPORT`] as one newline-terminated block.
pub fn status_report_text() -> String {
    let mut text = STATUS_REPORT.join("\n");
    text.push('\n');
    text
}

/// A socket path inside `dir`.
pub fn temp_socket_path(dir: &TempDir) -> PathBuf {
    dir.path().join("mgmt.sock")
}
