//! Protocol module containing the message types and the binary codec.

pub mod codec;
pub mod demo;
pub mod message;

pub use codec::{decode_header, encode_frame, encode_header, FixedLayout, ProtocolError};
pub use message::*;
