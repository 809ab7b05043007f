//! Error type shared by the connection, client, and server layers.
//!
//! Setup errors (`Resolution`, `Connect`, `Bind`) are returned to whoever
//! called `connect` / `start`.  Errors on an established connection (`Io`,
//! `Protocol`) never leave the I/O thread: they close that one connection and
//! are only observable through `is_connected()` returning `false`.

use std::net::SocketAddr;

use thiserror::Error;

use crate::protocol::codec::ProtocolError;
use crate::transport::connection::Role;

/// Errors produced by the tcpmsg transport layer.
#[derive(Debug, Error)]
pub enum NetError {
    /// The host/port pair could not be resolved to any address.
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolution {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The TCP handshake failed for every resolved address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The server could not bind or listen.
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A read or write on an established connection failed.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer sent a frame that could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// An operation was attempted on a connection owned by the other role.
    #[error("operation requires a {expected:?} connection, this one is {actual:?}")]
    WrongRole { expected: Role, actual: Role },

    /// The background I/O thread or its runtime could not be created.
    #[error("failed to start I/O runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The I/O runtime stopped before the operation completed.
    #[error("I/O runtime is not running")]
    RuntimeStopped,
}
