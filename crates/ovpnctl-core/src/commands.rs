//! Management command lines.

/// Client list report; the reply is a `CLIENT_LIST` block.
pub const STATUS: &str = "status 1";
/// Let a daemon started with `--management-hold` proceed.
pub const HOLD_RELEASE: &str = "hold release";
pub const ECHO_ON: &str = "echo on";
pub const STATE_ON: &str = "state on";

/// Enable `BYTECOUNT` notifications every `secs` seconds; `0` disables them.
pub fn bytecount(secs: u64) -> String {
    format!("bytecount {secs}")
}

/// Send a signal such as `SIGHUP` or `SIGTERM` to the daemon.
pub fn signal(name: &str) -> String {
    format!("signal {name}")
}

pub fn client_kill(client_id: &str) -> String {
    format!("client-kill {client_id}")
}
