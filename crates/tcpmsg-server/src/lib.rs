//! tcpmsg-server library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does tcpmsg-server do? (for beginners)
//!
//! The server listens on one TCP port and keeps many client connections
//! open at once:
//!
//! 1. [`Server::start`] binds the port and starts accepting on a background
//!    I/O thread.
//! 2. Each accepted socket is offered to
//!    [`ServerHooks::on_client_connect`]; admitted clients get a
//!    [`ConnectionId`](tcpmsg_core::ConnectionId) counting up from the
//!    configured first id.
//! 3. Messages from every client collect in one inbound queue.  The
//!    application calls [`Server::update`] from its own thread to hand them
//!    to [`ServerHooks::on_message`].
//! 4. [`Server::message_client`] and [`Server::message_all`] send replies;
//!    clients found closed along the way are removed and reported through
//!    [`ServerHooks::on_client_disconnect`].

/// Application layer: hooks and the demo echo application.
pub mod application;

/// Infrastructure layer: the network engine and config storage.
pub mod infrastructure;

pub use application::hooks::{MessageSender, NoopHooks, ServerHooks};
pub use infrastructure::network::Server;
pub use infrastructure::storage::config::ServerConfig;
