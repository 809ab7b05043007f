//! Server: accepts many clients, tracks them by id, and dispatches their
//! messages to the application hooks.
//!
//! # Threads
//!
//! ```text
//!  I/O thread ("tcpmsg-server-io")            application thread(s)
//!  ───────────────────────────────            ─────────────────────
//!  accept loop ─▶ on_client_connect           update() ─▶ on_message
//!       │             │ true                   message_client / message_all
//!       │             ▼                              │ closed target found
//!       │        assign id, insert ─▶ set ◀─ remove ─┘
//!       ▼                                            └─▶ on_client_disconnect
//!  read loops ─▶ inbound queue ─▶ update()
//! ```
//!
//! The connection set is the only owner of approved connections.  Everyone
//! else refers to a connection by [`ConnectionId`] and looks it up under the
//! set's lock, so a removed connection can never be used again.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tcpmsg_core::{
    Connection, ConnectionId, IoContext, Message, MessageKind, NetError, OwnedMessage,
    ThreadSafeDeque,
};
use tokio::net::{lookup_host, TcpListener};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::application::hooks::{MessageSender, ServerHooks};
use crate::infrastructure::storage::config::ServerConfig;

/// Name of the server's I/O thread.
const IO_THREAD_NAME: &str = "tcpmsg-server-io";

/// Back-off after a failed `accept`, so a persistent error (e.g. out of file
/// descriptors) does not spin the I/O thread.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// State shared between the server handle and its accept loop.
struct Shared<T: MessageKind, H> {
    hooks: H,
    connections: Mutex<Vec<Arc<Connection<T>>>>,
    next_id: AtomicU32,
    inbound: Arc<ThreadSafeDeque<OwnedMessage<T>>>,
    max_payload_len: u64,
}

impl<T: MessageKind, H> Shared<T, H> {
    fn connections(&self) -> MutexGuard<'_, Vec<Arc<Connection<T>>>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A multi-client message server.
pub struct Server<T: MessageKind, H: ServerHooks<T>> {
    config: ServerConfig,
    shared: Arc<Shared<T, H>>,
    context: Option<IoContext>,
    local_addr: Option<SocketAddr>,
}

impl<T: MessageKind, H: ServerHooks<T>> Server<T, H> {
    /// Creates a stopped server.
    pub fn new(config: ServerConfig, hooks: H) -> Self {
        let shared = Arc::new(Shared {
            hooks,
            connections: Mutex::new(Vec::new()),
            next_id: AtomicU32::new(config.server.first_client_id),
            inbound: Arc::new(ThreadSafeDeque::new()),
            max_payload_len: config.server.max_payload_len,
        });
        Self {
            config,
            shared,
            context: None,
            local_addr: None,
        }
    }

    /// The configuration this server was created with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The application hooks.
    pub fn hooks(&self) -> &H {
        &self.shared.hooks
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Binds the listener and starts accepting clients.
    ///
    /// Blocks until the listener is bound, so bind failures are reported
    /// here.  Calling `start` on a running server does nothing.
    ///
    /// # Errors
    ///
    /// - [`NetError::Runtime`] if the I/O thread cannot be started.
    /// - [`NetError::Resolution`] if the bind address does not resolve.
    /// - [`NetError::Bind`] if no resolved address could be bound.
    pub fn start(&mut self) -> Result<(), NetError> {
        if self.is_running() {
            warn!("server already running on {:?}", self.local_addr);
            return Ok(());
        }

        let context = IoContext::start(IO_THREAD_NAME)?;
        let host = self.config.server.bind_address.clone();
        let port = self.config.server.port;
        let (listener, local_addr) = context.run(bind(host, port))??;

        context.post(accept_loop(Arc::clone(&self.shared), listener));
        info!("server started on {local_addr}");

        self.context = Some(context);
        self.local_addr = Some(local_addr);
        Ok(())
    }

    /// Stops accepting, closes every connection, and joins the I/O thread.
    ///
    /// Closed connections stay in the set until the next
    /// `message_client` / `message_all` finds them, which reports each one
    /// through `on_client_disconnect`.  Idempotent.
    pub fn stop(&mut self) {
        let Some(mut context) = self.context.take() else {
            return;
        };

        for connection in self.shared.connections().iter() {
            connection.disconnect();
        }
        // Lets the queued closes run before the runtime goes away.
        let _ = context.run(async {});
        context.stop();

        self.local_addr = None;
        info!("server stopped");
    }

    /// `true` between a successful [`start`](Self::start) and
    /// [`stop`](Self::stop).
    pub fn is_running(&self) -> bool {
        self.context.is_some()
    }

    /// Address the listener is bound to, while running.  Useful when the
    /// configured port is `0`.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    // ── Connection set ────────────────────────────────────────────────────────

    /// Number of connections in the set, including closed ones not yet
    /// pruned.
    pub fn connection_count(&self) -> usize {
        self.shared.connections().len()
    }

    /// Ids of the connections in the set, in admission order.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.shared
            .connections()
            .iter()
            .filter_map(|connection| connection.id())
            .collect()
    }

    /// `true` if `id` is in the set and its socket is still open.
    pub fn is_client_connected(&self, id: ConnectionId) -> bool {
        self.shared
            .connections()
            .iter()
            .any(|connection| connection.id() == Some(id) && connection.is_connected())
    }

    /// Removes the connections with the given ids in one pass, then reports
    /// each removed connection once.
    fn prune(&self, ids: &[ConnectionId]) {
        let mut removed = Vec::new();
        self.shared.connections().retain(|connection| {
            let gone = connection.id().is_some_and(|id| ids.contains(&id));
            if gone {
                removed.push(Arc::clone(connection));
            }
            !gone
        });

        // Outside the lock: the hook may call back into the server.
        for connection in removed {
            info!("{connection} removed");
            self.shared.hooks.on_client_disconnect(&connection);
        }
    }

    // ── Messaging ─────────────────────────────────────────────────────────────

    /// Sends `msg` to the client with `id`.
    ///
    /// If that client's socket has closed, nothing is sent: the connection is
    /// removed and `on_client_disconnect` is called.  An id that is no longer
    /// in the set is ignored.
    pub fn message_client(&self, id: ConnectionId, msg: &Message<T>) {
        let target = self
            .shared
            .connections()
            .iter()
            .find(|connection| connection.id() == Some(id))
            .cloned();

        match target {
            Some(connection) if connection.is_connected() => connection.send(msg.clone()),
            Some(_) => self.prune(&[id]),
            None => debug!("[{id}] not connected, dropping {msg}"),
        }
    }

    /// Sends `msg` to every connected client except `exclude`.
    ///
    /// Clients found closed during the pass are removed afterwards in a
    /// single step, and each is reported once through `on_client_disconnect`.
    pub fn message_all(&self, msg: &Message<T>, exclude: Option<ConnectionId>) {
        let mut closed = Vec::new();
        for connection in self.shared.connections().iter() {
            if connection.is_connected() {
                if connection.id() != exclude {
                    connection.send(msg.clone());
                }
            } else if let Some(id) = connection.id() {
                closed.push(id);
            }
        }

        if !closed.is_empty() {
            self.prune(&closed);
        }
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Dispatches up to `max` queued inbound messages to `on_message` on the
    /// calling thread; `None` means "until the queue is empty".
    ///
    /// Returns the number of messages dispatched.
    pub fn update(&self, max: Option<usize>) -> usize {
        let limit = max.unwrap_or(usize::MAX);
        let mut dispatched = 0;
        while dispatched < limit {
            let Some(owned) = self.shared.inbound.try_pop_front() else {
                break;
            };
            self.shared
                .hooks
                .on_message(self, owned.origin, owned.message);
            dispatched += 1;
        }
        dispatched
    }

    /// Inbound messages waiting for [`update`](Self::update).
    pub fn pending_messages(&self) -> usize {
        self.shared.inbound.len()
    }
}

impl<T: MessageKind, H: ServerHooks<T>> MessageSender<T> for Server<T, H> {
    fn message_client(&self, id: ConnectionId, msg: &Message<T>) {
        Server::message_client(self, id, msg);
    }

    fn message_all(&self, msg: &Message<T>, exclude: Option<ConnectionId>) {
        Server::message_all(self, msg, exclude);
    }
}

impl<T: MessageKind, H: ServerHooks<T>> Drop for Server<T, H> {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── I/O-thread tasks ──────────────────────────────────────────────────────────

/// Resolves `host:port` and binds the first address that works.
async fn bind(host: String, port: u16) -> Result<(TcpListener, SocketAddr), NetError> {
    let addrs: Vec<SocketAddr> = lookup_host((host.as_str(), port))
        .await
        .map_err(|source| NetError::Resolution {
            host: host.clone(),
            port,
            source,
        })?
        .collect();

    let mut last_error = None;
    for addr in addrs {
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                let local_addr = listener.local_addr()?;
                return Ok((listener, local_addr));
            }
            Err(source) => {
                warn!("bind failed on {addr}: {source}");
                last_error = Some(NetError::Bind { addr, source });
            }
        }
    }

    Err(last_error.unwrap_or_else(|| NetError::Resolution {
        host,
        port,
        source: io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
    }))
}

/// Accepts clients until the I/O context stops.
async fn accept_loop<T: MessageKind, H: ServerHooks<T>>(
    shared: Arc<Shared<T, H>>,
    listener: TcpListener,
) {
    let handle = Handle::current();
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("accept failed: {e}");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };
        info!("new connection from {peer}");

        let candidate = Connection::new_server(
            handle.clone(),
            stream,
            Arc::clone(&shared.inbound),
            shared.max_payload_len,
        );
        if !shared.hooks.on_client_connect(&candidate) {
            // Dropping the only handle closes the socket.
            info!("connection from {peer} denied");
            continue;
        }

        let id = ConnectionId(shared.next_id.fetch_add(1, Ordering::SeqCst));
        let mut connections = shared.connections();
        match candidate.connect_to_client(id) {
            Ok(()) => {
                connections.push(candidate);
                info!("[{id}] connection from {peer} approved");
            }
            Err(e) => warn!("connection from {peer} lost before approval: {e}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
