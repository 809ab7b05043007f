//! # tcpmsg-core
//!
//! Shared library for tcpmsg containing the binary message codec, the
//! thread-safe queue that decouples I/O from application threads, and the
//! per-socket connection engine.
//!
//! This crate is used by both the server and client engines.  It knows
//! nothing about what the messages *mean*: applications bring their own
//! message-kind enumeration and payload layouts.
//!
//! # Architecture overview (for beginners)
//!
//! A tcpmsg process is either a *client* (one outbound TCP connection) or a
//! *server* (many inbound TCP connections).  Both sides exchange discrete,
//! typed, length-prefixed binary messages.
//!
//! This crate (`tcpmsg-core`) is the shared foundation.  It defines:
//!
//! - **`queue`** – A double-ended queue guarded by a single lock.  Every
//!   connection has one for outbound messages, and every engine has one for
//!   inbound messages.
//!
//! - **`protocol`** – How bytes travel over the network.  A message is a
//!   12-byte header (kind + payload length) followed by the payload.  Payload
//!   fields are appended and extracted with fixed-size, big-endian layouts.
//!
//! - **`transport`** – The [`Connection`] state machine (read loop + write
//!   loop for one socket) and the [`IoContext`] that owns the background
//!   thread driving all socket I/O.

pub mod protocol;
pub mod queue;
pub mod transport;

// Re-export the most-used types at the crate root so callers can write
// `tcpmsg_core::Message` instead of `tcpmsg_core::protocol::message::Message`.
pub use protocol::codec::{FixedLayout, ProtocolError, HEADER_SIZE, MAX_PAYLOAD_LEN};
pub use protocol::message::{ConnectionId, Message, MessageHeader, MessageKind, OwnedMessage};
pub use queue::ThreadSafeDeque;
pub use transport::connection::{Connection, Role};
pub use transport::error::NetError;
pub use transport::io_context::IoContext;
