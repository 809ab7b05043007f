//! tcpmsg-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does tcpmsg-client do? (for beginners)
//!
//! The client opens one TCP connection to a tcpmsg server and exchanges typed
//! messages with it:
//!
//! 1. [`Client::connect`] resolves the server, performs the handshake on a
//!    background I/O thread, and returns once the socket is open.
//! 2. [`Client::send`] queues a message; the I/O thread writes it out.
//! 3. Received messages collect in [`Client::incoming`] until the
//!    application pops them.
//! 4. [`Client::disconnect`] (or dropping the client) closes the socket and
//!    stops the I/O thread.

/// Infrastructure layer: the network engine and config storage.
pub mod infrastructure;

pub use infrastructure::network::Client;
pub use infrastructure::storage::config::ClientConfig;
