//! Message kinds used by the bundled `tcpmsg-server` / `tcpmsg-client`
//! binaries and by the test suites.
//!
//! Real applications define their own enumeration; this one only exists so
//! the demo programs have something to talk about.

use serde::{Deserialize, Serialize};

/// Demo message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum DemoKind {
    /// Server → client: the connection was approved.
    Accepted = 0x01,
    /// Client → server: round-trip probe, payload is an opaque timestamp.
    Ping = 0x02,
    /// Server → client: echo of a `Ping` payload.
    Pong = 0x03,
    /// Client → server: relay the payload to every other client.
    /// Server → client: a relayed payload, the sender id is the last field.
    Broadcast = 0x04,
    /// Free-form payload.
    Text = 0x05,
}

impl From<DemoKind> for u32 {
    fn from(kind: DemoKind) -> Self {
        kind as u32
    }
}

impl TryFrom<u32> for DemoKind {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        match value {
            0x01 => Ok(DemoKind::Accepted),
            0x02 => Ok(DemoKind::Ping),
            0x03 => Ok(DemoKind::Pong),
            0x04 => Ok(DemoKind::Broadcast),
            0x05 => Ok(DemoKind::Text),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_maps_back_from_its_tag() {
        for kind in [
            DemoKind::Accepted,
            DemoKind::Ping,
            DemoKind::Pong,
            DemoKind::Broadcast,
            DemoKind::Text,
        ] {
            assert_eq!(DemoKind::try_from(u32::from(kind)), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        assert_eq!(DemoKind::try_from(0), Err(()));
        assert_eq!(DemoKind::try_from(0xFF), Err(()));
    }
}
