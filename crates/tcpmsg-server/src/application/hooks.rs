//! Extension points the embedding application plugs into the server.
//!
//! # How hooks are called (for beginners)
//!
//! | Hook                   | Thread                       | When                                   |
//! |------------------------|------------------------------|----------------------------------------|
//! | `on_client_connect`    | server I/O thread            | a socket was accepted, before it gets an id |
//! | `on_client_disconnect` | whichever thread detected it | a send found the connection closed     |
//! | `on_message`           | the thread calling `update`  | a queued inbound message is dispatched |
//!
//! Every method has a default body, so an application implements only the
//! hooks it cares about:
//!
//! ```rust
//! use tcpmsg_core::{ConnectionId, Message};
//! use tcpmsg_server::application::hooks::{MessageSender, ServerHooks};
//!
//! struct Echo;
//!
//! impl ServerHooks<u32> for Echo {
//!     fn on_message(&self, server: &dyn MessageSender<u32>, origin: Option<ConnectionId>, msg: Message<u32>) {
//!         if let Some(id) = origin {
//!             server.message_client(id, &msg);
//!         }
//!     }
//! }
//! ```
//!
//! Hooks are never called while the server holds its connection-set lock, so
//! they may call back into the server freely.

use tcpmsg_core::{Connection, ConnectionId, Message, MessageKind};

/// Outbound operations available to hooks.
///
/// Implemented by the server engine.  Taking `&dyn MessageSender` keeps
/// application code free of the concrete network types and lets tests supply
/// a recording fake.
pub trait MessageSender<T: MessageKind> {
    /// Sends `msg` to one client.  A closed target is removed and reported
    /// through `on_client_disconnect` instead.
    fn message_client(&self, id: ConnectionId, msg: &Message<T>);

    /// Sends `msg` to every connected client except `exclude`.
    fn message_all(&self, msg: &Message<T>, exclude: Option<ConnectionId>);
}

/// Application callbacks invoked by the server.
pub trait ServerHooks<T: MessageKind>: Send + Sync + 'static {
    /// Decides whether a freshly accepted socket is admitted.
    ///
    /// Returning `false` closes the socket; the connection never receives an
    /// id and never enters the connection set.  Messages sent on `candidate`
    /// from here are delivered once it is approved.
    fn on_client_connect(&self, _candidate: &Connection<T>) -> bool {
        true
    }

    /// Called exactly once for each connection the server removes after
    /// finding it closed.
    fn on_client_disconnect(&self, _connection: &Connection<T>) {}

    /// Called from [`update`](crate::Server::update) for each inbound
    /// message.  `origin` is the connection it arrived on.
    fn on_message(
        &self,
        _server: &dyn MessageSender<T>,
        _origin: Option<ConnectionId>,
        _message: Message<T>,
    ) {
    }
}

/// Hooks that admit everyone and ignore everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl<T: MessageKind> ServerHooks<T> for NoopHooks {}

// ── Tests ─────────────────────────────────────────────────────────────────────
