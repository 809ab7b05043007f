//! In-memory message representation.
//!
//! A [`Message`] is a header plus a payload buffer.  The payload is built by
//! appending fixed-layout fields with [`Message::push`] and consumed by
//! extracting them again from the *end* with [`Message::pop`]:
//!
//! ```text
//! sender:   push(a) push(b) push(c)      payload = [a][b][c]
//! receiver: pop() -> c, pop() -> b, pop() -> a
//! ```
//!
//! Sender and receiver must agree on the field order.  Extracting fields in a
//! different order than the reverse of insertion yields wrong values, not an
//! error: the payload carries no field boundaries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::codec::{FixedLayout, ProtocolError, HEADER_SIZE};

/// An application-defined message discriminant.
///
/// Blanket-implemented for every small copyable type that converts to and
/// from a `u32` wire tag.  Applications usually write a `#[repr(u32)]` enum
/// with `From<Kind> for u32` and `TryFrom<u32> for Kind`; a bare `u32` also
/// works when the tag is kept opaque.
pub trait MessageKind:
    Copy + fmt::Debug + PartialEq + Send + Sync + 'static + Into<u32> + TryFrom<u32>
{
}

impl<T> MessageKind for T where
    T: Copy + fmt::Debug + PartialEq + Send + Sync + 'static + Into<u32> + TryFrom<u32>
{
}

/// Server-assigned identity of a connection.
///
/// This is a non-owning handle: holders look the connection up in the
/// server's connection set before using it, so a stale id is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Header preceding every payload on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessageHeader<T> {
    /// Identifies the payload type.
    pub kind: T,
    /// Length of the payload in bytes (not including this header).
    pub size: u64,
}

/// A typed message that exclusively owns its payload buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Message<T> {
    pub header: MessageHeader<T>,
    pub payload: Vec<u8>,
}

impl<T: MessageKind> Message<T> {
    /// Creates an empty message of the given kind.
    pub fn new(kind: T) -> Self {
        Self {
            header: MessageHeader { kind, size: 0 },
            payload: Vec::new(),
        }
    }

    /// Rebuilds a received message from its decoded header and payload.
    pub(crate) fn from_parts(header: MessageHeader<T>, payload: Vec<u8>) -> Self {
        Self { header, payload }
    }

    /// The message kind.
    pub fn kind(&self) -> T {
        self.header.kind
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` when the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Bytes this message occupies on the wire, header included.
    pub fn framed_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Appends a fixed-layout field to the payload.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tcpmsg_core::Message;
    ///
    /// let mut msg = Message::new(1u32);
    /// msg.push(10u16).push(true);
    /// assert_eq!(msg.header.size, 3);
    /// assert!(msg.pop::<bool>().unwrap());
    /// assert_eq!(msg.pop::<u16>().unwrap(), 10);
    /// ```
    pub fn push<F: FixedLayout>(&mut self, value: F) -> &mut Self {
        self.payload.reserve(F::WIRE_SIZE);
        value.write_to(&mut self.payload);
        self.sync_size();
        self
    }

    /// Removes the last-appended field from the payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadUnderflow`] when fewer than
    /// `F::WIRE_SIZE` bytes remain.  The payload is left untouched.
    pub fn pop<F: FixedLayout>(&mut self) -> Result<F, ProtocolError> {
        let available = self.payload.len();
        let start = available
            .checked_sub(F::WIRE_SIZE)
            .ok_or(ProtocolError::PayloadUnderflow {
                needed: F::WIRE_SIZE,
                available,
            })?;
        let value = F::read_from(&self.payload[start..]);
        self.payload.truncate(start);
        self.sync_size();
        Ok(value)
    }

    /// Empties the payload.
    pub fn clear(&mut self) {
        self.payload.clear();
        self.sync_size();
    }

    fn sync_size(&mut self) {
        self.header.size = self.payload.len() as u64;
    }
}

impl<T: MessageKind> fmt::Display for Message<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kind: {:?} size: {}", self.header.kind, self.header.size)
    }
}

/// A received message tagged with the connection it arrived on.
///
/// `origin` is `Some` for messages received by a server and `None` for
/// messages received by a client (which only ever has one connection).
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedMessage<T> {
    pub origin: Option<ConnectionId>,
    pub message: Message<T>,
}

impl<T: MessageKind> fmt::Display for OwnedMessage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            Some(id) => write!(f, "[{id}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
