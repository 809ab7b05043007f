//! Socket-facing half of the core: the I/O runtime and the per-socket
//! connection engine.
//!
//! # Sub-modules
//!
//! - **`io_context`** – Owns one background OS thread that drives a
//!   single-threaded tokio runtime.  Every socket operation for every
//!   connection of an engine runs on that thread.
//!
//! - **`connection`** – One TCP socket, its read state machine, its write
//!   state machine, and its outbound queue.
//!
//! - **`error`** – The [`NetError`](error::NetError) taxonomy shared by the
//!   client and server engines.

pub mod connection;
pub mod error;
pub mod io_context;
