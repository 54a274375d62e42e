//! Command responses to decoded events.
//!
//! [`VpnActions`] turns an event into the command line that answers it;
//! the caller decides whether and when to send it.

use std::time::Duration;

use crate::event::{ClientSubtype, EventKind, EventRecord};

/// Deny reason used by [`StandardActions::default`].
pub const DEFAULT_DENY_REASON: &str = "Invalid username or password";

pub trait VpnActions: Send + Sync {
    /// Accept the client named by a `CLIENT:CONNECT` or `CLIENT:REAUTH` record.
    fn authenticated(&self, record: &EventRecord) -> String;

    /// Reject the client named by a `CLIENT:CONNECT` or `CLIENT:REAUTH` record.
    fn unauthenticated(&self, record: &EventRecord) -> String;

    /// Answer a `HOLD` notification.
    fn hold_release(&self, record: &EventRecord) -> String;

    /// Request `BYTECOUNT` notifications at `interval`.
    fn usage(&self, interval: Duration) -> String;

    /// Commands answering a `HOLD`: turn on log echo and state
    /// notifications, then release the hold.
    fn hold_commands(&self, record: &EventRecord) -> Vec<String> {
        vec![
            crate::commands::ECHO_ON.to_string(),
            crate::commands::STATE_ON.to_string(),
            self.hold_release(record),
        ]
    }

    /// The automatic answer to `record`, if it needs one.
    ///
    /// Client authentication requests are accepted when `accept_clients`
    /// is set and denied otherwise; holds are always released.
    fn respond(&self, record: &EventRecord, accept_clients: bool) -> Option<String> {
        match (&record.kind, &record.subtype) {
            (EventKind::Hold, _) => Some(self.hold_release(record)),
            (EventKind::Client, Some(ClientSubtype::Connect | ClientSubtype::Reauth)) => {
                if accept_clients {
                    Some(self.authenticated(record))
                } else {
                    Some(self.unauthenticated(record))
                }
            }
            _ => None,
        }
    }
}

/// The stock responses.
#[derive(Debug, Clone)]
pub struct StandardActions {
    pub deny_reason: String,
}

impl Default for StandardActions {
    fn default() -> Self {
        Self {
            deny_reason: DEFAULT_DENY_REASON.to_string(),
        }
    }
}

impl VpnActions for StandardActions {
    fn authenticated(&self, record: &EventRecord) -> String {
        format!(
            "client-auth-nt {} {}",
            record.get("client_id"),
            record.get("key_id")
        )
    }

    fn unauthenticated(&self, record: &EventRecord) -> String {
        format!(
            "client-deny {} {} \"{}\"",
            record.get("client_id"),
            record.get("key_id"),
            self.deny_reason
        )
    }

    fn hold_release(&self, _record: &EventRecord) -> String {
        crate::commands::HOLD_RELEASE.to_string()
    }

    fn usage(&self, interval: Duration) -> String {
        crate::commands::bytecount(interval.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn connect() -> EventRecord {
        Parser::new().parse_line(">CLIENT:CONNECT,89,2").unwrap()
    }

    #[test]
    fn test_authenticated() {
        assert_eq!(
            StandardActions::default().authenticated(&connect()),
            "client-auth-nt 89 2"
        );
    }

    #[test]
    fn test_unauthenticated_quotes_reason() {
        let actions = StandardActions {
            deny_reason: "certificate revoked".to_string(),
        };
        assert_eq!(
            actions.unauthenticated(&connect()),
            "client-deny 89 2 \"certificate revoked\""
        );
    }

    #[test]
    fn test_usage_whole_seconds() {
        let actions = StandardActions::default();
        assert_eq!(actions.usage(Duration::from_secs(5)), "bytecount 5");
        assert_eq!(actions.usage(Duration::from_millis(2500)), "bytecount 2");
        assert_eq!(actions.usage(Duration::from_millis(300)), "bytecount 0");
        assert_eq!(actions.usage(Duration::ZERO), "bytecount 0");
    }

    #[test]
    fn test_hold_commands_enable_notifications_first() {
        let hold = Parser::new()
            .parse_line(">HOLD:Waiting for hold release:0")
            .unwrap();
        assert_eq!(
            StandardActions::default().hold_commands(&hold),
            vec!["echo on", "state on", "hold release"]
        );
    }

    #[test]
    fn test_respond() {
        let actions = StandardActions::default();
        let hold = Parser::new()
            .parse_line(">HOLD:Waiting for hold release:0")
            .unwrap();
        assert_eq!(actions.respond(&hold, false).as_deref(), Some("hold release"));
        assert_eq!(
            actions.respond(&connect(), true).as_deref(),
            Some("client-auth-nt 89 2")
        );
        assert!(
            actions
                .respond(&connect(), false)
                .unwrap()
                .starts_with("client-deny 89 2")
        );

        let bytes = Parser::new().parse_line(">BYTECOUNT:1,2").unwrap();
        assert_eq!(actions.respond(&bytes, true), None);
    }
}
