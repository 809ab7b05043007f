//! Binary codec for tcpmsg frames and fixed-layout payload fields.
//!
//! Wire format:
//! ```text
//! [kind:4][size:8][payload:size]
//! ```
//! Total header size: 12 bytes.  All multi-byte integers are big-endian.
//! `size` is the payload length only; it never includes the header.
//!
//! Payload fields are written with [`FixedLayout`], a trait for values whose
//! encoded size is known at compile time and that contain no indirection.
//! `Vec`, `String` and references deliberately do not implement it, so an
//! attempt to push one into a message is rejected by the compiler.

use thiserror::Error;

use crate::protocol::message::{MessageHeader, MessageKind};
use crate::protocol::Message;

/// Size of the frame header on the wire.
pub const HEADER_SIZE: usize = 12;

/// Largest payload a connection will allocate for by default (16 MiB).
pub const MAX_PAYLOAD_LEN: u64 = 16 * 1024 * 1024;

/// Errors that can occur while encoding, decoding, or extracting fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A field extraction asked for more bytes than remain in the payload.
    #[error("payload underflow: need {needed} bytes, {available} remain")]
    PayloadUnderflow { needed: usize, available: usize },

    /// The kind tag in the header is not known to the application's enumeration.
    #[error("unknown message kind: 0x{0:08X}")]
    UnknownMessageKind(u32),

    /// The header declares a payload larger than the receiver accepts.
    #[error("payload of {declared} bytes exceeds the {limit} byte limit")]
    OversizedPayload { declared: u64, limit: u64 },
}

// ── Fixed-layout fields ───────────────────────────────────────────────────────

/// A value with a fixed, indirection-free wire representation.
///
/// Implementors must write exactly [`WIRE_SIZE`](Self::WIRE_SIZE) bytes in
/// [`write_to`](Self::write_to), and [`read_from`](Self::read_from) is always
/// given exactly that many bytes.
///
/// Applications can implement this for their own plain records:
///
/// ```rust
/// use tcpmsg_core::FixedLayout;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// struct Point { x: i32, y: i32 }
///
/// impl FixedLayout for Point {
///     const WIRE_SIZE: usize = 8;
///
///     fn write_to(&self, out: &mut Vec<u8>) {
///         self.x.write_to(out);
///         self.y.write_to(out);
///     }
///
///     fn read_from(bytes: &[u8]) -> Self {
///         Point { x: i32::read_from(&bytes[..4]), y: i32::read_from(&bytes[4..]) }
///     }
/// }
/// ```
pub trait FixedLayout: Sized {
    /// Number of bytes this value occupies on the wire.
    const WIRE_SIZE: usize;

    /// Appends exactly `WIRE_SIZE` bytes to `out`.
    fn write_to(&self, out: &mut Vec<u8>);

    /// Rebuilds a value from exactly `WIRE_SIZE` bytes.
    fn read_from(bytes: &[u8]) -> Self;
}

macro_rules! impl_fixed_layout_for_numbers {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FixedLayout for $ty {
                const WIRE_SIZE: usize = std::mem::size_of::<$ty>();

                fn write_to(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_be_bytes());
                }

                fn read_from(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::WIRE_SIZE]);
                    <$ty>::from_be_bytes(raw)
                }
            }
        )*
    };
}

impl_fixed_layout_for_numbers!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64);

impl FixedLayout for bool {
    const WIRE_SIZE: usize = 1;

    fn write_to(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }

    fn read_from(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

impl<F: FixedLayout, const N: usize> FixedLayout for [F; N] {
    const WIRE_SIZE: usize = F::WIRE_SIZE * N;

    fn write_to(&self, out: &mut Vec<u8>) {
        for item in self {
            item.write_to(out);
        }
    }

    fn read_from(bytes: &[u8]) -> Self {
        std::array::from_fn(|i| F::read_from(&bytes[i * F::WIRE_SIZE..(i + 1) * F::WIRE_SIZE]))
    }
}

// ── Header and frame encoding ─────────────────────────────────────────────────

/// Encodes a header into its 12-byte wire form.
///
/// # Examples
///
/// ```rust
/// use tcpmsg_core::protocol::{encode_header, decode_header, MessageHeader};
///
/// let header = MessageHeader { kind: 7u32, size: 3 };
/// let bytes = encode_header(&header);
/// assert_eq!(bytes, [0, 0, 0, 7, 0, 0, 0, 0, 0, 0, 0, 3]);
/// assert_eq!(decode_header::<u32>(&bytes).unwrap(), header);
/// ```
pub fn encode_header<T: MessageKind>(header: &MessageHeader<T>) -> [u8; HEADER_SIZE] {
    let mut buf = [0u8; HEADER_SIZE];
    let tag: u32 = header.kind.into();
    buf[..4].copy_from_slice(&tag.to_be_bytes());
    buf[4..].copy_from_slice(&header.size.to_be_bytes());
    buf
}

/// Decodes a 12-byte wire header.
///
/// # Errors
///
/// Returns [`ProtocolError::UnknownMessageKind`] when the tag does not map to
/// a value of `T`.
pub fn decode_header<T: MessageKind>(
    bytes: &[u8; HEADER_SIZE],
) -> Result<MessageHeader<T>, ProtocolError> {
    let tag = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let kind = T::try_from(tag).map_err(|_| ProtocolError::UnknownMessageKind(tag))?;
    let size = u64::read_from(&bytes[4..]);
    Ok(MessageHeader { kind, size })
}

/// Encodes a complete frame: header followed by the payload bytes.
pub fn encode_frame<T: MessageKind>(msg: &Message<T>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(msg.framed_len());
    buf.extend_from_slice(&encode_header(&msg.header));
    buf.extend_from_slice(&msg.payload);
    buf
}

/// Rejects headers that declare a payload above `limit`.
pub(crate) fn check_payload_len(declared: u64, limit: u64) -> Result<(), ProtocolError> {
    if declared > limit {
        Err(ProtocolError::OversizedPayload { declared, limit })
    } else {
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::demo::DemoKind;

    #[test]
    fn test_header_size_matches_encoded_length() {
        let header = MessageHeader {
            kind: DemoKind::Ping,
            size: 0,
        };
        assert_eq!(encode_header(&header).len(), HEADER_SIZE);
    }

    #[test]
    fn test_header_layout_is_big_endian_kind_then_size() {
        // Arrange
        let header = MessageHeader {
            kind: 0x0102_0304u32,
            size: 0x0506_0708_090A_0B0C,
        };

        // Act
        let bytes = encode_header(&header);

        // Assert
        assert_eq!(
            bytes,
            [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C]
        );
    }

    #[test]
    fn test_decode_header_with_unknown_kind_fails() {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..4].copy_from_slice(&0xDEAD_BEEFu32.to_be_bytes());

        let result = decode_header::<DemoKind>(&bytes);

        assert_eq!(result, Err(ProtocolError::UnknownMessageKind(0xDEAD_BEEF)));
    }

    #[test]
    fn test_decode_header_recovers_demo_kind_and_size() {
        let header = MessageHeader {
            kind: DemoKind::Text,
            size: 42,
        };
        let decoded = decode_header::<DemoKind>(&encode_header(&header)).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_encode_frame_is_header_followed_by_payload() {
        // Arrange
        let mut msg = Message::new(DemoKind::Text);
        msg.push(0xAABBu16);

        // Act
        let frame = encode_frame(&msg);

        // Assert
        assert_eq!(frame.len(), HEADER_SIZE + 2);
        assert_eq!(&frame[4..HEADER_SIZE], &2u64.to_be_bytes());
        assert_eq!(&frame[HEADER_SIZE..], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_numbers_are_written_big_endian() {
        let mut out = Vec::new();
        0x1234_5678u32.write_to(&mut out);
        (-2i16).write_to(&mut out);
        assert_eq!(out, vec![0x12, 0x34, 0x56, 0x78, 0xFF, 0xFE]);
    }

    #[test]
    fn test_float_survives_write_then_read() {
        let mut out = Vec::new();
        std::f64::consts::PI.write_to(&mut out);
        assert_eq!(out.len(), f64::WIRE_SIZE);
        assert_eq!(f64::read_from(&out), std::f64::consts::PI);
    }

    #[test]
    fn test_bool_uses_one_byte() {
        let mut out = Vec::new();
        true.write_to(&mut out);
        false.write_to(&mut out);
        assert_eq!(out, vec![1, 0]);
        assert!(bool::read_from(&[0x7F]));
    }

    #[test]
    fn test_array_wire_size_is_element_size_times_len() {
        assert_eq!(<[u16; 5] as FixedLayout>::WIRE_SIZE, 10);
        assert_eq!(<[[u8; 3]; 2] as FixedLayout>::WIRE_SIZE, 6);
    }

    #[test]
    fn test_array_elements_keep_their_order() {
        let mut out = Vec::new();
        [1u16, 2, 3].write_to(&mut out);
        assert_eq!(out, vec![0, 1, 0, 2, 0, 3]);
        assert_eq!(<[u16; 3]>::read_from(&out), [1, 2, 3]);
    }

    #[test]
    fn test_check_payload_len_rejects_oversized() {
        assert_eq!(check_payload_len(10, 10), Ok(()));
        assert_eq!(
            check_payload_len(11, 10),
            Err(ProtocolError::OversizedPayload {
                declared: 11,
                limit: 10
            })
        );
    }
}
