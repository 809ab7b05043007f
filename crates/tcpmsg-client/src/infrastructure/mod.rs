//! Infrastructure layer for the client.
//!
//! # Sub-modules
//!
//! - **`network`** – The [`Client`](network::Client) engine: one outbound
//!   connection, its I/O thread, and the inbound queue.
//!
//! - **`storage`** – TOML configuration file persistence.

pub mod network;
pub mod storage;
