//! Network infrastructure for the client: the [`Client`] engine.
//!
//! # How the client works (for beginners)
//!
//! A `Client` owns exactly one [`Connection`] to one server, plus the
//! [`IoContext`] thread that performs all of that connection's socket I/O.
//!
//! ```text
//!  application thread                     I/O thread ("tcpmsg-client-io")
//!  ──────────────────                     ───────────────────────────────
//!  client.connect(host, port) ──run──▶    resolve, TCP handshake
//!  client.send(msg)           ──queue──▶  write loop drains outbound queue
//!  client.incoming().try_pop_front() ◀──  read loop pushes inbound messages
//!  client.disconnect()        ──post──▶   close socket, then thread stops
//! ```
//!
//! There is no callback for received messages: the application drains
//! [`Client::incoming`] at its own pace.  When the server goes away,
//! [`Client::is_connected`] turns `false` and the queue simply stops growing.
//! Nothing reconnects automatically.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tcpmsg_core::{
    Connection, IoContext, Message, MessageKind, NetError, OwnedMessage, ThreadSafeDeque,
};
use tokio::net::lookup_host;
use tracing::{debug, info, warn};

use crate::infrastructure::storage::config::ClientConfig;

/// Name of the client's I/O thread.
const IO_THREAD_NAME: &str = "tcpmsg-client-io";

/// A single-connection message client.
pub struct Client<T: MessageKind> {
    config: ClientConfig,
    inbound: Arc<ThreadSafeDeque<OwnedMessage<T>>>,
    context: Option<IoContext>,
    connection: Option<Arc<Connection<T>>>,
}

impl<T: MessageKind> Client<T> {
    /// Creates a disconnected client.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            inbound: Arc::new(ThreadSafeDeque::new()),
            context: None,
            connection: None,
        }
    }

    /// The configuration this client was created with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolves `host:port`, connects, and starts receiving.
    ///
    /// Blocks the calling thread until the TCP handshake has succeeded or
    /// failed.  An existing connection is closed first.
    ///
    /// # Errors
    ///
    /// - [`NetError::Runtime`] if the I/O thread cannot be started.
    /// - [`NetError::Resolution`] if `host` resolves to nothing.
    /// - [`NetError::Connect`] if no resolved address accepted the connection.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), NetError> {
        self.disconnect();

        let context = IoContext::start(IO_THREAD_NAME)?;
        let addrs = context.run(resolve(host.to_string(), port))??;
        debug!("{host}:{port} resolved to {addrs:?}");

        let connection = Connection::new_client(
            context.handle().clone(),
            Arc::clone(&self.inbound),
            self.config.client.max_payload_len,
        );
        let connecting = Arc::clone(&connection);
        context.run(async move { connecting.connect_to_server(&addrs).await })??;

        info!("client connected to {host}:{port}");
        self.context = Some(context);
        self.connection = Some(connection);
        Ok(())
    }

    /// Closes the connection, stops the I/O thread, and releases both.
    ///
    /// Does nothing when not connected.  Messages already in
    /// [`incoming`](Self::incoming) stay there.
    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            if connection.is_connected() {
                connection.disconnect();
            }
        }
        if let Some(mut context) = self.context.take() {
            // Lets the queued close run before the runtime goes away.
            let _ = context.run(async {});
            context.stop();
            info!("client disconnected");
        }
    }

    /// `true` while the connection to the server is open.
    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|connection| connection.is_connected())
    }

    /// Queues `msg` for the server.  Dropped with a warning when not
    /// connected.
    pub fn send(&self, msg: Message<T>) {
        match &self.connection {
            Some(connection) if connection.is_connected() => connection.send(msg),
            _ => warn!("not connected, dropping {msg}"),
        }
    }

    /// Messages received from the server, oldest first.
    pub fn incoming(&self) -> &ThreadSafeDeque<OwnedMessage<T>> {
        &self.inbound
    }
}

impl<T: MessageKind> Drop for Client<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn resolve(host: String, port: u16) -> Result<Vec<SocketAddr>, NetError> {
    let resolution_error = |source: io::Error| NetError::Resolution {
        host: host.clone(),
        port,
        source,
    };

    let addrs: Vec<SocketAddr> = lookup_host((host.as_str(), port))
        .await
        .map_err(resolution_error)?
        .collect();
    if addrs.is_empty() {
        return Err(resolution_error(io::Error::new(
            io::ErrorKind::NotFound,
            "no addresses found",
        )));
    }
    Ok(addrs)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
