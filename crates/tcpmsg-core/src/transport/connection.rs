//! One TCP socket and the two state machines that drive it.
//!
//! # Read side
//!
//! ```text
//! AwaitingHeader ──header(size > 0)──▶ AwaitingBody ──body──▶ Dispatch
//!       ▲   │                                                    │
//!       │   └──────────────header(size == 0)────────────────────▶│
//!       └──────────────────── pushed to inbound queue ◀──────────┘
//! ```
//!
//! # Write side
//!
//! ```text
//! Idle ──send() wakes──▶ Draining ──queue empty──▶ Idle
//! ```
//!
//! While draining, the writer peeks the front message, writes its header,
//! writes its body (if any), and only then pops it.  There is exactly one
//! writer task per socket, so frames are never interleaved and messages hit
//! the wire in the order `send` was called.
//!
//! Any failure on either side is terminal: the socket is closed, both loops
//! stop, and [`Connection::is_connected`] starts returning `false`.  There is
//! no retry.
//!
//! # Ownership
//!
//! The engine that creates a connection (client or server) holds the only
//! long-lived `Arc`.  Everything else refers to it by [`ConnectionId`].  The
//! read and write tasks also hold an `Arc` while they run; closing the
//! connection aborts them.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::protocol::codec::{
    check_payload_len, decode_header, encode_header, ProtocolError, HEADER_SIZE,
};
use crate::protocol::message::{ConnectionId, Message, MessageHeader, MessageKind, OwnedMessage};
use crate::queue::ThreadSafeDeque;
use crate::transport::error::NetError;

/// Which kind of engine owns a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// The single outbound connection of a client.
    Client,
    /// One of the many accepted connections of a server.
    Server,
}

/// Read-side states.
enum ReadState<T> {
    AwaitingHeader,
    AwaitingBody(MessageHeader<T>),
    Dispatch(Message<T>),
}

/// Write-side states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    Idle,
    Draining,
}

/// A framed, bidirectional message connection over one TCP socket.
pub struct Connection<T: MessageKind> {
    role: Role,
    id: OnceLock<ConnectionId>,
    peer: OnceLock<SocketAddr>,
    handle: Handle,
    inbound: Arc<ThreadSafeDeque<OwnedMessage<T>>>,
    outbound: ThreadSafeDeque<Message<T>>,
    max_payload_len: u64,
    open: AtomicBool,
    /// Accepted socket waiting for `connect_to_client`.
    pending: Mutex<Option<TcpStream>>,
    write_ready: Notify,
    tasks: Mutex<Vec<AbortHandle>>,
}

impl<T: MessageKind> Connection<T> {
    /// Creates an unconnected client-role connection.
    ///
    /// `handle` must belong to the engine's [`IoContext`](super::io_context::IoContext);
    /// received messages are pushed onto `inbound` without an origin.
    pub fn new_client(
        handle: Handle,
        inbound: Arc<ThreadSafeDeque<OwnedMessage<T>>>,
        max_payload_len: u64,
    ) -> Arc<Self> {
        Arc::new(Self::with_parts(Role::Client, handle, inbound, max_payload_len, None))
    }

    /// Wraps a freshly accepted socket in a server-role connection.
    ///
    /// The socket is open but nothing is read from it until
    /// [`connect_to_client`](Self::connect_to_client) assigns an id.
    pub fn new_server(
        handle: Handle,
        stream: TcpStream,
        inbound: Arc<ThreadSafeDeque<OwnedMessage<T>>>,
        max_payload_len: u64,
    ) -> Arc<Self> {
        let peer = stream.peer_addr().ok();
        let conn = Self::with_parts(Role::Server, handle, inbound, max_payload_len, Some(stream));
        if let Some(peer) = peer {
            let _ = conn.peer.set(peer);
        }
        Arc::new(conn)
    }

    fn with_parts(
        role: Role,
        handle: Handle,
        inbound: Arc<ThreadSafeDeque<OwnedMessage<T>>>,
        max_payload_len: u64,
        stream: Option<TcpStream>,
    ) -> Self {
        Self {
            role,
            id: OnceLock::new(),
            peer: OnceLock::new(),
            handle,
            inbound,
            outbound: ThreadSafeDeque::new(),
            max_payload_len,
            open: AtomicBool::new(stream.is_some()),
            pending: Mutex::new(stream),
            write_ready: Notify::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// The owning engine's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Server-assigned id; `None` for client connections and for server
    /// connections that were never approved.
    pub fn id(&self) -> Option<ConnectionId> {
        self.id.get().copied()
    }

    /// Remote address, once known.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer.get().copied()
    }

    /// `true` while the underlying socket is open.
    pub fn is_connected(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Messages queued but not yet fully written.
    pub fn pending_outbound(&self) -> usize {
        self.outbound.len()
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Connects a client-role connection to the first reachable address and
    /// starts reading.
    ///
    /// Must be awaited on the engine's I/O context.
    ///
    /// # Errors
    ///
    /// - [`NetError::WrongRole`] on a server-role connection.
    /// - [`NetError::Connect`] if no address accepted the handshake.
    pub async fn connect_to_server(self: &Arc<Self>, addrs: &[SocketAddr]) -> Result<(), NetError> {
        self.require_role(Role::Client)?;

        let mut last_failure: Option<(SocketAddr, io::Error)> = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    let _ = self.peer.set(*addr);
                    info!("connected to server at {addr}");
                    self.start(stream);
                    return Ok(());
                }
                Err(e) => {
                    debug!("connect attempt to {addr} failed: {e}");
                    last_failure = Some((*addr, e));
                }
            }
        }

        let err = match last_failure {
            Some((addr, source)) => NetError::Connect {
                addr: addr.to_string(),
                source,
            },
            None => NetError::Connect {
                addr: "<no addresses>".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "address list was empty"),
            },
        };
        warn!("connection failed: {err}");
        Err(err)
    }

    /// Approves an accepted server-role connection: assigns its id and
    /// starts reading.
    ///
    /// # Errors
    ///
    /// - [`NetError::WrongRole`] on a client-role connection.
    /// - [`NetError::Io`] with `NotConnected` if the socket is no longer open.
    pub fn connect_to_client(self: &Arc<Self>, id: ConnectionId) -> Result<(), NetError> {
        self.require_role(Role::Server)?;

        let stream = lock(&self.pending).take();
        match stream {
            Some(stream) if self.is_connected() => {
                let _ = self.id.set(id);
                self.start(stream);
                Ok(())
            }
            _ => Err(NetError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "socket is not open",
            ))),
        }
    }

    /// Queues `msg` for sending.
    ///
    /// The message is appended to the outbound queue on the calling thread;
    /// the writer task on the I/O thread is woken to put it on the wire.
    /// Messages sent on a closed connection are dropped.
    pub fn send(&self, msg: Message<T>) {
        if !self.is_connected() {
            debug!("{self}: dropping {msg} on closed connection");
            return;
        }
        self.outbound.push_back(msg);
        self.write_ready.notify_one();
    }

    /// Schedules the socket to be closed on the I/O thread.  Idempotent.
    pub fn disconnect(self: &Arc<Self>) {
        let this = Arc::clone(self);
        self.handle.spawn(async move {
            this.close();
        });
    }

    fn require_role(&self, expected: Role) -> Result<(), NetError> {
        if self.role == expected {
            Ok(())
        } else {
            Err(NetError::WrongRole {
                expected,
                actual: self.role,
            })
        }
    }

    /// Splits the socket and spawns the read and write loops.
    fn start(self: &Arc<Self>, stream: TcpStream) {
        let (reader, writer) = stream.into_split();
        self.open.store(true, Ordering::SeqCst);

        let read_task = self.handle.spawn(Arc::clone(self).read_loop(reader));
        let write_task = self.handle.spawn(Arc::clone(self).write_loop(writer));
        lock(&self.tasks).extend([read_task.abort_handle(), write_task.abort_handle()]);

        // A close that slipped in before the handles were registered.
        if !self.is_connected() {
            self.close();
        }
    }

    /// Closes the socket by aborting both loops, which drops both halves.
    fn close(&self) {
        let was_open = self.open.swap(false, Ordering::SeqCst);
        lock(&self.pending).take();
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
        if was_open {
            info!("{self}: connection closed");
        }
    }

    // ── Read state machine ────────────────────────────────────────────────────

    async fn read_loop(self: Arc<Self>, mut reader: OwnedReadHalf) {
        let mut state = ReadState::AwaitingHeader;
        loop {
            state = match self.advance_read(state, &mut reader).await {
                Ok(next) => next,
                Err(NetError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    info!("{self}: peer closed the connection");
                    self.close();
                    return;
                }
                Err(e) => {
                    warn!("{self}: read failed: {e}");
                    self.close();
                    return;
                }
            };
        }
    }

    async fn advance_read(
        &self,
        state: ReadState<T>,
        reader: &mut OwnedReadHalf,
    ) -> Result<ReadState<T>, NetError> {
        match state {
            ReadState::AwaitingHeader => {
                let mut raw = [0u8; HEADER_SIZE];
                reader.read_exact(&mut raw).await?;
                let header = decode_header::<T>(&raw)?;
                check_payload_len(header.size, self.max_payload_len)?;
                Ok(if header.size > 0 {
                    ReadState::AwaitingBody(header)
                } else {
                    ReadState::Dispatch(Message::from_parts(header, Vec::new()))
                })
            }
            ReadState::AwaitingBody(header) => {
                let len = usize::try_from(header.size).map_err(|_| {
                    ProtocolError::OversizedPayload {
                        declared: header.size,
                        limit: usize::MAX as u64,
                    }
                })?;
                let mut payload = vec![0u8; len];
                reader.read_exact(&mut payload).await?;
                Ok(ReadState::Dispatch(Message::from_parts(header, payload)))
            }
            ReadState::Dispatch(message) => {
                let origin = match self.role {
                    Role::Server => self.id(),
                    Role::Client => None,
                };
                self.inbound.push_back(OwnedMessage { origin, message });
                Ok(ReadState::AwaitingHeader)
            }
        }
    }

    // ── Write state machine ───────────────────────────────────────────────────

    async fn write_loop(self: Arc<Self>, mut writer: OwnedWriteHalf) {
        // Start draining in case anything was queued before the socket opened.
        let mut state = WriteState::Draining;
        loop {
            state = match state {
                WriteState::Idle => {
                    self.write_ready.notified().await;
                    WriteState::Draining
                }
                WriteState::Draining => match self.outbound.front() {
                    Some(msg) => {
                        if let Err(e) = write_frame(&mut writer, &msg).await {
                            warn!("{self}: write failed: {e}");
                            self.close();
                            return;
                        }
                        // Popped only after the whole frame is on the wire.
                        self.outbound.pop_front();
                        WriteState::Draining
                    }
                    None => WriteState::Idle,
                },
            };
        }
    }
}

async fn write_frame<T: MessageKind>(
    writer: &mut OwnedWriteHalf,
    msg: &Message<T>,
) -> io::Result<()> {
    writer.write_all(&encode_header(&msg.header)).await?;
    if !msg.payload.is_empty() {
        writer.write_all(&msg.payload).await?;
    }
    Ok(())
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: MessageKind> fmt::Display for Connection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.role, self.id()) {
            (Role::Server, Some(id)) => write!(f, "[{id}]"),
            (Role::Server, None) => write!(f, "[-----]"),
            (Role::Client, _) => write!(f, "[client]"),
        }
    }
}

impl<T: MessageKind> fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("role", &self.role)
            .field("id", &self.id())
            .field("peer", &self.peer_addr())
            .field("open", &self.is_connected())
            .field("pending_outbound", &self.outbound.len())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
