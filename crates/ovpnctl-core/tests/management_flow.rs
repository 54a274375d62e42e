//! End-to-end management flows against fake daemons.

use std::time::{Duration, Instant};

use ovpnctl_core::{
    CommandOutcome, EventKind, EventRecord, Management, Parser, StandardActions, VpnActions,
};
use ovpnctl_test_utils::config::TestConfigBuilder;
use ovpnctl_test_utils::fake_daemon::{DialingDaemon, ScriptedDaemon};
use ovpnctl_test_utils::fixtures::{
    CLIENT_CONNECT, CLIENT_ESTABLISHED, GREETING, STATUS_REPORT, temp_socket_path,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(5);

async fn next_event(events: &mut mpsc::Receiver<EventRecord>) -> EventRecord {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream closed")
}

async fn wait_for_session(mgmt: &Management) {
    tokio::time::timeout(WAIT, async {
        while mgmt.connector().session_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("daemon never connected");
}

#[test_log::test(tokio::test)]
async fn server_over_unix_socket_answers_auth_requests() {
    let dir = TempDir::new().unwrap();
    let socket = temp_socket_path(&dir);
    let config = TestConfigBuilder::new()
        .server_mode()
        .socket(&socket)
        .build();

    let mut mgmt = Management::from_config(&config.management);
    let mut events = mgmt.start_server().await.unwrap();
    let mut daemon = DialingDaemon::connect_unix(&socket).await.unwrap();
    wait_for_session(&mgmt).await;

    daemon.send_line(GREETING).await.unwrap();
    daemon.send_lines(CLIENT_CONNECT).await.unwrap();

    let actions = StandardActions::default();
    let mut answered = Vec::new();
    while answered.is_empty() {
        let record = next_event(&mut events).await;
        if let Some(reply) = actions.respond(&record, true) {
            mgmt.exec(&reply).await;
            answered.push(reply);
        }
    }
    assert_eq!(answered, vec!["client-auth-nt 0 1".to_string()]);
    assert_eq!(
        daemon.next_line().await.unwrap().as_deref(),
        Some("client-auth-nt 0 1")
    );

    mgmt.shutdown().await.unwrap();
    assert!(!socket.exists());
}

#[test_log::test(tokio::test)]
async fn server_collects_env_for_status_report() {
    let config = TestConfigBuilder::new()
        .server_mode()
        .address("127.0.0.1:0")
        .build();
    let mut mgmt = Management::from_config(&config.management);
    let mut events = mgmt.start_server().await.unwrap();
    let addr = mgmt.connector().local_addr().unwrap().to_string();
    let mut daemon = DialingDaemon::connect_tcp(&addr).await.unwrap();

    let established: Vec<String> = CLIENT_ESTABLISHED
        .iter()
        .map(|line| line.replace("alice", "VPN_client"))
        .collect();
    for line in &established {
        daemon.send_line(line).await.unwrap();
    }
    daemon.send_lines(STATUS_REPORT).await.unwrap();

    let report = loop {
        let record = next_event(&mut events).await;
        if record.kind == EventKind::ClientList {
            break record;
        }
    };
    let clients = mgmt.get_clients(&report).unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].public_ip, "10.13.156.4:1194");
    assert_eq!(clients[0].env["X509_0_CN"], "VPN_client");

    mgmt.shutdown().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn server_drops_commands_without_session() {
    let config = TestConfigBuilder::new()
        .server_mode()
        .address("127.0.0.1:0")
        .build();
    let mut mgmt = Management::from_config(&config.management);
    let _events = mgmt.start_server().await.unwrap();

    let started = Instant::now();
    assert_eq!(mgmt.status().await.unwrap(), CommandOutcome::Dropped);
    assert!(started.elapsed() < Duration::from_secs(1));

    mgmt.shutdown().await.unwrap();
    mgmt.shutdown().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn client_status_round_trip() {
    let daemon = ScriptedDaemon::builder()
        .greeting(GREETING)
        .reply("status 1", STATUS_REPORT)
        .spawn_tcp()
        .await
        .unwrap();
    let config = TestConfigBuilder::new()
        .client_mode()
        .address(daemon.addr())
        .build();

    let mut mgmt = Management::from_config(&config.management);
    let mut lines = mgmt.start_client().await.unwrap();
    let outcome = mgmt.status().await.unwrap();
    assert_eq!(outcome.reply(), Some("OpenVPN CLIENT LIST"));

    let mut parser = Parser::new();
    let mut seen = Vec::new();
    let report = tokio::time::timeout(WAIT, async {
        while let Some(line) = lines.recv().await {
            seen.push(line.clone());
            if let Some(record) = parser.parse_line(&line) {
                if record.kind == EventKind::ClientList {
                    return record;
                }
            }
        }
        panic!("line stream closed before the report");
    })
    .await
    .unwrap();

    assert_eq!(seen.first().map(String::as_str), Some(GREETING));
    let clients = mgmt.get_clients(&report).unwrap();
    assert_eq!(clients[0].bytes_sent, 14885);
    mgmt.shutdown().await.unwrap();
}
