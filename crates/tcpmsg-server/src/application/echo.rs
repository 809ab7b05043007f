//! The demo server application used by the `tcpmsg-server` binary.
//!
//! - New clients are greeted with an empty `Accepted`.
//! - `Ping` is answered with a `Pong` carrying the same payload, so the
//!   client can compute the round-trip time from its own timestamp.
//! - `Broadcast` is relayed to every other client with the sender's id
//!   appended as the last (`u32`) field.
//! - Anything else is logged and dropped.

use tcpmsg_core::protocol::demo::DemoKind;
use tcpmsg_core::{Connection, ConnectionId, Message};
use tracing::{debug, info};

use crate::application::hooks::{MessageSender, ServerHooks};

/// Echo / relay hooks.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoHooks;

impl ServerHooks<DemoKind> for EchoHooks {
    fn on_client_connect(&self, candidate: &Connection<DemoKind>) -> bool {
        if let Some(peer) = candidate.peer_addr() {
            info!("admitting client from {peer}");
        }
        candidate.send(Message::new(DemoKind::Accepted));
        true
    }

    fn on_client_disconnect(&self, connection: &Connection<DemoKind>) {
        info!("{connection} client left");
    }

    fn on_message(
        &self,
        server: &dyn MessageSender<DemoKind>,
        origin: Option<ConnectionId>,
        mut message: Message<DemoKind>,
    ) {
        let Some(origin) = origin else {
            return;
        };

        match message.kind() {
            DemoKind::Ping => {
                debug!("[{origin}] ping");
                message.header.kind = DemoKind::Pong;
                server.message_client(origin, &message);
            }
            DemoKind::Broadcast => {
                info!("[{origin}] broadcast of {} bytes", message.len());
                message.push(origin.0);
                server.message_all(&message, Some(origin));
            }
            _ => info!("[{origin}] {message}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        direct: Mutex<Vec<(ConnectionId, Message<DemoKind>)>>,
        broadcast: Mutex<Vec<(Message<DemoKind>, Option<ConnectionId>)>>,
    }

    impl MessageSender<DemoKind> for RecordingSender {
        fn message_client(&self, id: ConnectionId, msg: &Message<DemoKind>) {
            self.direct.lock().unwrap().push((id, msg.clone()));
        }

        fn message_all(&self, msg: &Message<DemoKind>, exclude: Option<ConnectionId>) {
            self.broadcast.lock().unwrap().push((msg.clone(), exclude));
        }
    }

    #[test]
    fn test_ping_is_answered_with_pong_to_sender() {
        // Arrange
        let sender = RecordingSender::default();
        let mut ping = Message::new(DemoKind::Ping);
        ping.push(1234u64);

        // Act
        EchoHooks.on_message(&sender, Some(ConnectionId(10001)), ping);

        // Assert
        let direct = sender.direct.lock().unwrap();
        assert_eq!(direct.len(), 1);
        let (target, mut pong) = direct[0].clone();
        assert_eq!(target, ConnectionId(10001));
        assert_eq!(pong.kind(), DemoKind::Pong);
        assert_eq!(pong.pop::<u64>().unwrap(), 1234);
        assert!(sender.broadcast.lock().unwrap().is_empty());
    }

    #[test]
    fn test_broadcast_is_relayed_with_sender_id() {
        let sender = RecordingSender::default();
        let mut msg = Message::new(DemoKind::Broadcast);
        msg.push(7u8);

        EchoHooks.on_message(&sender, Some(ConnectionId(10000)), msg);

        let broadcast = sender.broadcast.lock().unwrap();
        assert_eq!(broadcast.len(), 1);
        let (mut relayed, exclude) = broadcast[0].clone();
        assert_eq!(exclude, Some(ConnectionId(10000)));
        assert_eq!(relayed.pop::<u32>().unwrap(), 10000);
        assert_eq!(relayed.pop::<u8>().unwrap(), 7);
    }

    #[test]
    fn test_other_kinds_and_unknown_origin_send_nothing() {
        let sender = RecordingSender::default();

        EchoHooks.on_message(&sender, Some(ConnectionId(1)), Message::new(DemoKind::Text));
        EchoHooks.on_message(&sender, None, Message::new(DemoKind::Ping));

        assert!(sender.direct.lock().unwrap().is_empty());
        assert!(sender.broadcast.lock().unwrap().is_empty());
    }
}
