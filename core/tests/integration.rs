//! Full session lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `DelugeClient` with
//! its real ureq transport over HTTP. The mock answers gzip-compressed
//! bodies and issues a session cookie, so this covers decompression and
//! cookie continuity end to end.

use std::time::Duration;

use deluge_rpc::{ClientConfig, DecodeError, DelugeClient, DelugeError, HostStatus, SessionState};
use mock_server::{ERR_NOT_AUTHENTICATED, ERR_UNKNOWN_METHOD, HOST_ID, PASSWORD};

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}/")
}

fn client(base_url: &str, password: &str) -> DelugeClient {
    let config = ClientConfig::new(base_url, password).with_timeout(Duration::from_secs(5));
    DelugeClient::new(&config).unwrap()
}

#[test]
fn session_lifecycle() {
    let base_url = start_server();
    let mut client = client(&base_url, PASSWORD);

    // Step 1: fresh client has no session.
    assert!(!client.check_session().unwrap().value);
    assert!(client.session().is_empty());

    // Step 2: protected calls are refused by the server, not the client.
    match client.get_hosts().unwrap_err() {
        DelugeError::Rpc(err) => assert_eq!(err.code, ERR_NOT_AUTHENTICATED),
        other => panic!("expected Rpc error, got {other:?}"),
    }

    // Step 3: login stores the session cookie.
    assert!(client.login().unwrap().value);
    assert_eq!(client.session_state(), SessionState::Authenticated);
    assert!(client.session().get("_session_id").is_some());
    assert!(client.check_session().unwrap().value);

    // Step 4: hosts.
    let hosts = client.get_hosts().unwrap().hosts;
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].id, HOST_ID);
    assert_eq!(hosts[0].hostname.as_deref(), Some("127.0.0.1"));
    assert_eq!(hosts[0].port, Some(58846));
    assert_eq!(hosts[0].status, HostStatus::Online);

    let status = client.get_host_status(HOST_ID).unwrap().hosts;
    assert_eq!(status.len(), 1);
    assert!(status[0].version.is_some());

    // Step 5: register listeners, then connect (server answers null).
    client.register_event_listeners().unwrap();
    assert!(!client.is_connected().unwrap().value);
    assert!(client.connect(HOST_ID).unwrap().value);
    assert!(client.is_connected().unwrap().value);

    // Step 6: events queued by the connect.
    let events = client.get_events().unwrap().events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "SessionStartedEvent");
    assert!(client.get_events().unwrap().events.is_empty());

    // Step 7: UI snapshot.
    let ui = client.update_ui_default().unwrap();
    assert!(ui.connected);
    assert_eq!(ui.torrent_count(), 2);
    assert_eq!(ui.stats.dht_nodes, 312);
    let names: Vec<&str> = ui.torrents().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["ubuntu-24.04-desktop-amd64.iso", "debian-12.5.0-amd64-netinst.iso"]
    );

    // Step 8: disconnect (null result means disconnected).
    assert!(!client.disconnect().unwrap().value);
    let ui = client.update_ui_default().unwrap();
    assert!(!ui.connected);
    assert_eq!(ui.torrent_count(), 0);

    // Step 9: delete the session; the server now treats us as logged out.
    assert!(client.delete_session().unwrap().value);
    assert_eq!(client.session_state(), SessionState::SessionClosed);
    assert!(!client.check_session().unwrap().value);
}

#[test]
fn ids_follow_call_order() {
    let base_url = start_server();
    let mut client = client(&base_url, PASSWORD);

    for expected in 0..3u64 {
        let response = client.call("system.listMethods", &[]).unwrap();
        assert_eq!(response.id(), Some(expected));
        assert_eq!(response.status, 200);
    }

    assert!(client.call("foo.bar", &[]).is_err());
    let response = client.call("system.listMethods", &[]).unwrap();
    assert_eq!(response.id(), Some(4));
}

#[test]
fn unknown_method_is_rpc_error() {
    let base_url = start_server();
    let mut client = client(&base_url, PASSWORD);

    match client.call("foo.bar", &[]).unwrap_err() {
        DelugeError::Rpc(err) => {
            assert_eq!(err.code, ERR_UNKNOWN_METHOD);
            assert_eq!(err.message.as_deref(), Some("Unknown method"));
        }
        other => panic!("expected Rpc error, got {other:?}"),
    }
}

#[test]
fn wrong_password_is_not_logged_in() {
    let base_url = start_server();
    let mut client = client(&base_url, "wrong");

    assert!(!client.login().unwrap().value);
    assert_eq!(client.session_state(), SessionState::Fresh);
    assert!(client.session().is_empty());
}

#[test]
fn unknown_host_status_is_decode_error() {
    let base_url = start_server();
    let mut client = client(&base_url, PASSWORD);
    client.login().unwrap();

    let err = client.get_host_status("no-such-host").unwrap_err();
    assert!(matches!(err, DelugeError::Decode(DecodeError::MissingField("result"))));
}

#[test]
fn unreachable_server_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut client = client(&format!("http://{addr}"), PASSWORD);
    assert!(matches!(client.check_session(), Err(DelugeError::Transport(_))));
    assert_eq!(client.next_id(), 1);
}
