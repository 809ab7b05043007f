//! Integration tests for the client engine against a plain loopback listener.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use tcpmsg_client::{Client, ClientConfig};
use tcpmsg_core::protocol::demo::DemoKind;
use tcpmsg_core::protocol::encode_frame;
use tcpmsg_core::{Message, NetError, HEADER_SIZE};
use tokio_test::{assert_err, assert_ok};

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

#[test]
fn test_connect_send_and_receive() {
    // Arrange
    let (listener, port) = listener();
    let mut client = Client::<DemoKind>::new(ClientConfig::default());

    // Act
    assert_ok!(client.connect("127.0.0.1", port));
    let (mut server_side, _) = listener.accept().unwrap();

    let mut ping = Message::new(DemoKind::Ping);
    ping.push(99u64);
    client.send(ping.clone());

    let mut reply = Message::new(DemoKind::Pong);
    reply.push(99u64);
    server_side.write_all(&encode_frame(&reply)).unwrap();

    // Assert
    assert!(client.is_connected());

    let mut wire = vec![0u8; ping.framed_len()];
    server_side
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    server_side.read_exact(&mut wire).unwrap();
    assert_eq!(wire, encode_frame(&ping));

    assert!(wait_until(|| !client.incoming().is_empty()));
    let received = client.incoming().pop_front().unwrap();
    assert_eq!(received.origin, None);
    assert_eq!(received.message, reply);
}

#[test]
fn test_connect_to_localhost_name_resolves() {
    let (listener, port) = listener();
    let mut client = Client::<DemoKind>::new(ClientConfig::default());

    // "localhost" may resolve to ::1 first; the IPv4 fallback must be tried.
    assert_ok!(client.connect("localhost", port));
    let _accepted = listener.accept().unwrap();

    assert!(client.is_connected());
}

#[test]
fn test_connect_to_closed_port_fails() {
    let port = {
        let (_listener, port) = listener();
        port
    };
    let mut client = Client::<DemoKind>::new(ClientConfig::default());

    let err = assert_err!(client.connect("127.0.0.1", port));

    assert!(matches!(err, NetError::Connect { .. }));
    assert!(!client.is_connected());
}

#[test]
fn test_connect_to_unresolvable_host_fails() {
    let mut client = Client::<DemoKind>::new(ClientConfig::default());

    let err = assert_err!(client.connect("tcpmsg.invalid", 60000));

    assert!(matches!(err, NetError::Resolution { .. }));
    assert!(!client.is_connected());
}

#[test]
fn test_disconnect_closes_socket() {
    // Arrange
    let (listener, port) = listener();
    let mut client = Client::<DemoKind>::new(ClientConfig::default());
    assert_ok!(client.connect("127.0.0.1", port));
    let (mut server_side, _) = listener.accept().unwrap();

    // Act
    client.disconnect();

    // Assert
    assert!(!client.is_connected());
    server_side
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut buf = [0u8; HEADER_SIZE];
    assert_eq!(server_side.read(&mut buf).unwrap(), 0);
}

#[test]
fn test_server_close_keeps_already_received_messages() {
    let (listener, port) = listener();
    let mut client = Client::<DemoKind>::new(ClientConfig::default());
    assert_ok!(client.connect("127.0.0.1", port));
    let (mut server_side, _) = listener.accept().unwrap();

    server_side
        .write_all(&encode_frame(&Message::new(DemoKind::Accepted)))
        .unwrap();
    drop(server_side);

    assert!(wait_until(|| !client.is_connected()));
    assert_eq!(client.incoming().len(), 1);
    assert_eq!(
        client.incoming().pop_front().unwrap().message.kind(),
        DemoKind::Accepted
    );
}

#[test]
fn test_reconnect_after_disconnect() {
    let (listener, port) = listener();
    let mut client = Client::<DemoKind>::new(ClientConfig::default());

    assert_ok!(client.connect("127.0.0.1", port));
    let _first = listener.accept().unwrap();
    client.disconnect();
    assert_ok!(client.connect("127.0.0.1", port));
    let _second = listener.accept().unwrap();

    assert!(client.is_connected());
}

#[test]
fn test_oversized_frame_from_server_disconnects_client() {
    let (listener, port) = listener();
    let mut config = ClientConfig::default();
    config.client.max_payload_len = 8;
    let mut client = Client::<DemoKind>::new(config);
    assert_ok!(client.connect("127.0.0.1", port));
    let (mut server_side, _) = listener.accept().unwrap();

    let mut big = Message::new(DemoKind::Text);
    big.push([0u8; 9]);
    server_side.write_all(&encode_frame(&big)).unwrap();

    assert!(wait_until(|| !client.is_connected()));
    assert!(client.incoming().is_empty());
}
