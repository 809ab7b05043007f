//! Infrastructure layer for the server.
//!
//! Contains the OS-facing adapters: the TCP server engine and file-system
//! storage for its configuration.
//!
//! # Sub-modules
//!
//! - **`network`** – The listener, accept loop, and connection set.
//!
//! - **`storage`** – TOML configuration file persistence.

pub mod network;
pub mod storage;
