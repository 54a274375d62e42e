//! Decoded management-interface event records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

/// Event category, taken from the text before the first colon.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Client,
    /// Block report produced by `status 1`.
    ClientList,
    ByteCount,
    ByteCountCli,
    State,
    Hold,
    Echo,
    Fatal,
    Info,
    Log,
    Password,
    Success,
    Error,
    Other(String),
}

impl EventKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "CLIENT" => Self::Client,
            "CLIENT_LIST" => Self::ClientList,
            "BYTECOUNT" => Self::ByteCount,
            "BYTECOUNT_CLI" => Self::ByteCountCli,
            "STATE" => Self::State,
            "HOLD" => Self::Hold,
            "ECHO" => Self::Echo,
            "FATAL" => Self::Fatal,
            "INFO" => Self::Info,
            "LOG" => Self::Log,
            "PASSWORD" => Self::Password,
            "SUCCESS" => Self::Success,
            "ERROR" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Client => "CLIENT",
            Self::ClientList => "CLIENT_LIST",
            Self::ByteCount => "BYTECOUNT",
            Self::ByteCountCli => "BYTECOUNT_CLI",
            Self::State => "STATE",
            Self::Hold => "HOLD",
            Self::Echo => "ECHO",
            Self::Fatal => "FATAL",
            Self::Info => "INFO",
            Self::Log => "LOG",
            Self::Password => "PASSWORD",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Secondary classifier of a `CLIENT` event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientSubtype {
    Connect,
    Reauth,
    Established,
    Disconnect,
    Address,
    Env,
    Unknown(String),
}

impl ClientSubtype {
    pub fn from_name(name: &str) -> Self {
        match name {
            "CONNECT" => Self::Connect,
            "REAUTH" => Self::Reauth,
            "ESTABLISHED" => Self::Established,
            "DISCONNECT" => Self::Disconnect,
            "ADDRESS" => Self::Address,
            "ENV" => Self::Env,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Connect => "CONNECT",
            Self::Reauth => "REAUTH",
            Self::Established => "ESTABLISHED",
            Self::Disconnect => "DISCONNECT",
            Self::Address => "ADDRESS",
            Self::Env => "ENV",
            Self::Unknown(name) => name,
        }
    }
}

impl fmt::Display for ClientSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ClientSubtype {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One decoded unit of protocol information.
///
/// Records leave the [`Parser`](crate::parser::Parser) only once `complete`
/// is set; partial records stay inside parser state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<ClientSubtype>,
    /// Pushed asynchronously (`>` prefix) rather than sent as a reply.
    pub realtime: bool,
    pub complete: bool,
    /// Recognized event with an unsupported shape.
    pub malformed: bool,
    pub fields: BTreeMap<String, String>,
    /// Undecoded tail, or the whole block for block reports.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub raw_payload: String,
}

impl EventRecord {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            subtype: None,
            realtime: false,
            complete: false,
            malformed: false,
            fields: BTreeMap::new(),
            raw_payload: String::new(),
        }
    }

    /// Dispatch key: `CLIENT_CONNECT`, `BYTECOUNT`, `CLIENT_LIST`, ...
    pub fn event_name(&self) -> String {
        match &self.subtype {
            Some(sub) if !sub.as_str().is_empty() => format!("{}_{}", self.kind, sub),
            _ => self.kind.to_string(),
        }
    }

    /// Field value, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn client_id(&self) -> Option<&str> {
        self.fields.get("client_id").map(String::as_str)
    }

    /// Certificate common name from a merged `CLIENT` environment.
    pub fn common_name(&self) -> Option<&str> {
        self.fields
            .get("X509_0_CN")
            .or_else(|| self.fields.get("common_name"))
            .map(String::as_str)
            .filter(|cn| !cn.is_empty())
    }

    pub fn is_client(&self) -> bool {
        self.kind == EventKind::Client
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.event_name())?;
        for (key, value) in &self.fields {
            write!(f, " {key}={value}")?;
        }
        if self.fields.is_empty() && !self.raw_payload.is_empty() && self.kind != EventKind::ClientList
        {
            write!(f, " {}", self.raw_payload)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_names_round_trip() {
        for name in ["CLIENT", "CLIENT_LIST", "BYTECOUNT_CLI", "HOLD", "SUCCESS"] {
            assert_eq!(EventKind::from_name(name).as_str(), name);
        }
        assert_eq!(
            EventKind::from_name("NEED-OK"),
            EventKind::Other("NEED-OK".to_string())
        );
    }

    #[test]
    fn test_event_name_with_and_without_subtype() {
        let mut record = EventRecord::new(EventKind::Client);
        record.subtype = Some(ClientSubtype::Connect);
        assert_eq!(record.event_name(), "CLIENT_CONNECT");

        let record = EventRecord::new(EventKind::ByteCount);
        assert_eq!(record.event_name(), "BYTECOUNT");
    }

    #[test]
    fn test_get_missing_field_is_empty() {
        let mut record = EventRecord::new(EventKind::Client);
        record.fields.insert("client_id".into(), "7".into());
        assert_eq!(record.get("client_id"), "7");
        assert_eq!(record.get("key_id"), "");
        assert_eq!(record.client_id(), Some("7"));
    }

    #[test]
    fn test_common_name_prefers_certificate() {
        let mut record = EventRecord::new(EventKind::Client);
        record.fields.insert("common_name".into(), "bob".into());
        assert_eq!(record.common_name(), Some("bob"));
        record.fields.insert("X509_0_CN".into(), "alice".into());
        assert_eq!(record.common_name(), Some("alice"));
    }

    #[test]
    fn test_display() {
        let mut record = EventRecord::new(EventKind::ByteCount);
        record.fields.insert("bytes_in".into(), "3".into());
        record.fields.insert("bytes_out".into(), "5".into());
        assert_eq!(record.to_string(), "BYTECOUNT bytes_in=3 bytes_out=5");

        let mut record = EventRecord::new(EventKind::State);
        record.raw_payload = "1,CONNECTED,SUCCESS".into();
        assert_eq!(record.to_string(), "STATE 1,CONNECTED,SUCCESS");
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let mut record = EventRecord::new(EventKind::Client);
        record.subtype = Some(ClientSubtype::Disconnect);
        record.fields.insert("client_id".into(), "4".into());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "CLIENT");
        assert_eq!(json["subtype"], "DISCONNECT");
        assert_eq!(json["fields"]["client_id"], "4");
        assert!(json.get("raw_payload").is_none());
    }
}
