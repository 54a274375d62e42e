//! Line-at-a-time decoder for the management protocol.
//!
//! The parser owns two independent pieces of state: one pending, possibly
//! partial, `CLIENT` record that later lines may extend, and a raw buffer
//! for the `status 1` block report. Only completed records are returned.
//!
//! ```text
//! >CLIENT:ESTABLISHED,7          -> pending {client_id=7}
//! >CLIENT:ENV,X509_0_CN=alice    -> pending {client_id=7, X509_0_CN=alice}
//! >BYTECOUNT:10,20               -> returned standalone, pending kept
//! >CLIENT:ENV,END                -> returned CLIENT_ESTABLISHED {client_id=7, X509_0_CN=alice}
//! ```

use tracing::{trace, warn};

use crate::event::{ClientSubtype, EventKind, EventRecord};

/// First line of the `status 1` block report.
pub const STATUS_BANNER: &str = "OpenVPN CLIENT LIST";

/// Sentinel closing a block report or a `CLIENT:ENV` sequence.
pub const END_MARKER: &str = "END";

/// Realtime notification prefix.
pub const REALTIME_MARKER: char = '>';

/// Stateful management-protocol parser. Feed lines in arrival order.
#[derive(Debug, Default)]
pub struct Parser {
    pending: Option<EventRecord>,
    block: Option<String>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one line, returning a record once it is complete.
    pub fn parse_line(&mut self, line: &str) -> Option<EventRecord> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(mut buffer) = self.block.take() {
            buffer.push_str(line);
            buffer.push('\n');
            if line.trim() == END_MARKER {
                trace!(bytes = buffer.len(), "status block complete");
                let mut record = EventRecord::new(EventKind::ClientList);
                record.raw_payload = buffer;
                record.complete = true;
                return Some(record);
            }
            self.block = Some(buffer);
            return None;
        }

        if line.trim().is_empty() {
            return None;
        }

        let (realtime, body) = match line.strip_prefix(REALTIME_MARKER) {
            Some(rest) => (true, rest),
            None => (false, line),
        };

        if !realtime && body.starts_with(STATUS_BANNER) {
            trace!("status block started");
            self.block = Some(format!("{line}\n"));
            return None;
        }

        let (name, payload) = body.split_once(':').unwrap_or((body, ""));
        let mut record = EventRecord::new(EventKind::from_name(name));
        record.realtime = realtime;
        let terminal = decode_payload(&mut record, payload);
        self.settle(record, terminal)
    }

    /// Drop any partial record and block buffer.
    pub fn reset(&mut self) {
        self.pending = None;
        self.block = None;
    }

    /// Whether a partial record or block report is buffered.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some() || self.block.is_some()
    }

    fn settle(&mut self, record: EventRecord, terminal: bool) -> Option<EventRecord> {
        match self.pending.take() {
            Some(mut pending) if continues(&pending, &record) => {
                pending.fields.extend(record.fields);
                pending.realtime |= record.realtime;
                if terminal {
                    pending.complete = true;
                    Some(pending)
                } else {
                    self.pending = Some(pending);
                    None
                }
            }
            stale => {
                // A different client's event supersedes the pending one; any
                // other interleaved event leaves it in place.
                let stale = match stale {
                    Some(stale) if !terminal || (stale.is_client() && record.is_client()) => {
                        warn!(
                            pending = %stale.event_name(),
                            incoming = %record.event_name(),
                            "discarding incomplete event record"
                        );
                        None
                    }
                    other => other,
                };
                if terminal {
                    self.pending = stale;
                    let mut record = record;
                    record.complete = true;
                    Some(record)
                } else {
                    self.pending = Some(record);
                    None
                }
            }
        }
    }
}

/// Whether `incoming` extends the same logical event as `pending`.
fn continues(pending: &EventRecord, incoming: &EventRecord) -> bool {
    if !pending.is_client() || !incoming.is_client() {
        return false;
    }
    if incoming.subtype == Some(ClientSubtype::Env) {
        return true;
    }
    matches!(
        (pending.client_id(), incoming.client_id()),
        (Some(a), Some(b)) if a == b
    )
}

/// Fill `record` from `payload`; returns whether the record is terminal.
fn decode_payload(record: &mut EventRecord, payload: &str) -> bool {
    match record.kind {
        EventKind::Client => decode_client(record, payload),
        EventKind::ByteCount => {
            assign(record, &["bytes_in", "bytes_out"], payload);
            true
        }
        EventKind::ByteCountCli => {
            assign(record, &["client_id", "bytes_in", "bytes_out"], payload);
            true
        }
        _ => {
            record.raw_payload = payload.to_string();
            true
        }
    }
}

fn decode_client(record: &mut EventRecord, payload: &str) -> bool {
    let (subtype, rest) = payload.split_once(',').unwrap_or((payload, ""));
    let subtype = ClientSubtype::from_name(subtype);

    let terminal = match &subtype {
        ClientSubtype::Connect | ClientSubtype::Reauth => {
            assign(record, &["client_id", "key_id"], rest);
            true
        }
        ClientSubtype::Established => {
            assign(record, &["client_id"], rest);
            false
        }
        ClientSubtype::Disconnect => {
            assign(record, &["client_id"], rest);
            true
        }
        ClientSubtype::Address => {
            assign(
                record,
                &["client_id", "client_address", "primary_address"],
                rest,
            );
            false
        }
        ClientSubtype::Env => {
            if rest == END_MARKER {
                true
            } else {
                let (key, value) = rest.split_once('=').unwrap_or((rest, ""));
                record.fields.insert(key.to_string(), value.to_string());
                false
            }
        }
        ClientSubtype::Unknown(name) => {
            trace!(subtype = %name, "unsupported CLIENT subtype");
            record.malformed = true;
            record.raw_payload = rest.to_string();
            true
        }
    };

    record.subtype = Some(subtype);
    terminal
}

/// Map comma-separated values positionally onto `names`.
fn assign(record: &mut EventRecord, names: &[&str], values: &str) {
    for (name, value) in names.iter().zip(values.split(',')) {
        record.fields.insert((*name).to_string(), value.to_string());
    }
}
