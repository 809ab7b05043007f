//! Application layer for the server.
//!
//! # What is the "application" layer? (for beginners)
//!
//! This layer holds the decisions an application makes about its clients:
//! who may connect, what to do when one leaves, and how to answer each
//! message.  It talks to the network only through the
//! [`MessageSender`](hooks::MessageSender) trait, never through sockets.
//!
//! # Sub-modules
//!
//! - **`hooks`** – The [`ServerHooks`](hooks::ServerHooks) extension points and
//!   the do-nothing [`NoopHooks`](hooks::NoopHooks).
//!
//! - **`echo`** – The demo application: answers pings and relays broadcasts.

pub mod echo;
pub mod hooks;
