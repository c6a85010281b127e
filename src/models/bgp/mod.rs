//! BGP messages and relevant structs.

pub mod aspath;
pub mod attributes;
pub mod capabilities;
pub mod community;
pub mod nlri;

pub use aspath::*;
pub use attributes::*;
pub use capabilities::*;
pub use community::*;
pub use nlri::*;

use crate::models::network::*;
use bytes::{BufMut, Bytes, BytesMut};
use ipnet::IpNet;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::net::Ipv4Addr;

pub type BgpIdentifier = Ipv4Addr;

/// Fixed BGP message header size: 16-byte marker, 2-byte length, 1-byte type.
pub const BGP_HEADER_SIZE: usize = 19;
pub const BGP_MARKER_SIZE: usize = 16;
/// Upper bound on a BGP message, header included (RFC 4271, Section 4.1).
pub const BGP_MAX_MESSAGE_SIZE: usize = 4096;
/// OPEN message size up to and including the option length octet.
pub const BGP_MIN_OPEN_MSG_SIZE: usize = 29;
pub const BGP_VERSION: u8 = 4;
/// Optional parameter type carrying capabilities (RFC 3392).
pub const BGP_PARAM_CAPABILITY: u8 = 2;

#[derive(Debug, TryFromPrimitive, IntoPrimitive, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BgpMessageType {
    OPEN = 1,
    UPDATE = 2,
    NOTIFICATION = 3,
    KEEPALIVE = 4,
}

/// BGP Open Message
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///  +-+-+-+-+-+-+-+-+
///  |    Version    |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |     My Autonomous System      |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |           Hold Time           |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |                         BGP Identifier                        |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  | Opt Parm Len  |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |                                                               |
///  |             Optional Parameters (variable)                    |
///  |                                                               |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgpOpenMessage {
    pub version: u8,
    /// The 2-octet "My Autonomous System" field; 4-octet speakers put
    /// [Asn::TRANSITION] here and the real value in a capability.
    pub asn: Asn,
    pub hold_time: u16,
    pub identifier: BgpIdentifier,
    /// Capabilities from every type-2 optional parameter, in wire order.
    /// Other parameter types are skipped over.
    pub capabilities: Vec<Capability>,
}

impl BgpOpenMessage {
    pub fn encode(&self) -> Bytes {
        let mut params = BytesMut::new();
        for cap in &self.capabilities {
            params.put_u8(BGP_PARAM_CAPABILITY);
            params.put_u8(cap.value.len() as u8 + 2);
            params.put_u8(u8::from(cap.code));
            params.put_u8(cap.value.len() as u8);
            params.put_slice(&cap.value);
        }

        let mut bytes = BytesMut::with_capacity(BGP_MIN_OPEN_MSG_SIZE + params.len());
        bytes.put_slice(&[0xff; BGP_MARKER_SIZE]);
        bytes.put_u16((BGP_MIN_OPEN_MSG_SIZE + params.len()) as u16);
        bytes.put_u8(BgpMessageType::OPEN.into());
        bytes.put_u8(self.version);
        bytes.put_u16(self.asn.to_u32() as u16);
        bytes.put_u16(self.hold_time);
        bytes.put_slice(&self.identifier.octets());
        bytes.put_u8(params.len() as u8);
        bytes.put_slice(&params);
        bytes.freeze()
    }
}

/// BGP Update Message.
///
/// Corresponding RFC section: <https://datatracker.ietf.org/doc/html/rfc4271#section-4.3>
///
/// Withdrawn and announced prefixes cover the IPv4 unicast portion of the
/// message only; other families travel in the MP attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BgpUpdateMessage {
    pub withdrawn_prefixes: Vec<IpNet>,
    pub attributes: PathAttributes,
    pub announced_prefixes: Vec<IpNet>,
    pub mp_reachable: Option<MpReachableNlri>,
    pub mp_unreachable: Option<MpUnreachableNlri>,
}

/// Write one KEEPALIVE message: a bare header.
pub fn encode_keepalive_message() -> Bytes {
    let mut bytes = BytesMut::with_capacity(BGP_HEADER_SIZE);
    bytes.put_slice(&[0xff; BGP_MARKER_SIZE]);
    bytes.put_u16(BGP_HEADER_SIZE as u16);
    bytes.put_u8(BgpMessageType::KEEPALIVE.into());
    bytes.freeze()
}
