//! Network infrastructure for the server.
//!
//! # Sub-modules
//!
//! - **`server`** – The [`Server`](server::Server) engine: the listener, the
//!   accept loop, the connection set, and message dispatch to the
//!   application hooks.

pub mod server;

pub use server::Server;
