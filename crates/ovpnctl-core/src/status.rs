//! Decoder for the `status 1` client list report.
//!
//! ```text
//! OpenVPN CLIENT LIST
//! Updated,Thu Feb 13 23:39:20 2014
//! Common Name,Real Address,Bytes Received,Bytes Sent,Connected Since   <- header
//! VPN_client,10.13.156.4:1194,12563,14885,Thu Feb 13 23:39:20 2014     <- one Client
//! ROUTING TABLE
//! ...
//! GLOBAL STATS
//! ...
//! END
//! ```
//!
//! Only the client table is consumed. The routing table is not
//! cross-referenced, so `private_ip` is empty unless the client table itself
//! carries a `Virtual Address` column.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::parser::{END_MARKER, STATUS_BANNER};

const UPDATED_PREFIX: &str = "Updated,";
const ROUTING_TABLE: &str = "ROUTING TABLE";
const GLOBAL_STATS: &str = "GLOBAL STATS";

/// Errors from decoding a status report.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StatusError {
    #[error("no client data found")]
    NoClientData,

    #[error("invalid client list: missing header row")]
    InvalidClientList,
}

/// One row of the client table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Client {
    pub common_name: String,
    pub public_ip: String,
    pub private_ip: String,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub last_ref: String,
    /// Certificate environment, filled by the management layer.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// A decoded status report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Text of the `Updated,` line.
    pub updated: String,
    pub clients: Vec<Client>,
}

/// Decode the clients of a `status 1` block.
pub fn parse_status(raw: &str) -> Result<Vec<Client>, StatusError> {
    parse_status_report(raw).map(|report| report.clients)
}

/// Decode a `status 1` block including its `Updated,` timestamp.
pub fn parse_status_report(raw: &str) -> Result<StatusReport, StatusError> {
    let mut lines = raw.lines().map(|line| line.trim_end_matches('\r'));

    lines
        .by_ref()
        .find(|line| line.starts_with(STATUS_BANNER))
        .ok_or(StatusError::NoClientData)?;

    let updated = lines
        .next()
        .and_then(|line| line.strip_prefix(UPDATED_PREFIX))
        .ok_or(StatusError::NoClientData)?
        .trim()
        .to_string();

    let mut table = Vec::new();
    loop {
        match lines.next() {
            Some(ROUTING_TABLE) => break,
            Some(line) => table.push(line),
            None => return Err(StatusError::NoClientData),
        }
    }
    if !lines.by_ref().any(|line| line == GLOBAL_STATS) {
        return Err(StatusError::NoClientData);
    }
    if !lines.any(|line| line.trim() == END_MARKER) {
        return Err(StatusError::NoClientData);
    }

    let clients = client_table(&table)?;
    Ok(StatusReport { updated, clients })
}

fn client_table(rows: &[&str]) -> Result<Vec<Client>, StatusError> {
    let mut rows = rows.iter().filter(|row| !row.trim().is_empty());
    let header: Vec<&str> = rows
        .next()
        .ok_or(StatusError::InvalidClientList)?
        .split(',')
        .collect();

    let clients = rows
        .map(|row| {
            let values: Vec<&str> = row.split(',').collect();
            Client {
                common_name: column(&header, &values, "Common Name").to_string(),
                public_ip: column(&header, &values, "Real Address").to_string(),
                private_ip: column(&header, &values, "Virtual Address").to_string(),
                bytes_received: column(&header, &values, "Bytes Received")
                    .parse()
                    .unwrap_or(0),
                bytes_sent: column(&header, &values, "Bytes Sent").parse().unwrap_or(0),
                last_ref: column(&header, &values, "Last Ref").to_string(),
                env: BTreeMap::new(),
            }
        })
        .collect();
    Ok(clients)
}

/// Value under `name` in a positional row, or `""` when absent.
fn column<'a>(header: &[&str], values: &[&'a str], name: &str) -> &'a str {
    header
        .iter()
        .position(|col| *col == name)
        .and_then(|idx| values.get(idx).copied())
        .unwrap_or("")
}
