//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the client's TOML file, writes it back, and
//! supplies defaults when no file exists yet (first run).

pub mod config;
