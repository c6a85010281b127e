use crate::error::ParserError;
use crate::models::{Afi, Safi};
use num_enum::{FromPrimitive, IntoPrimitive};

/// BGP capability codes.
///
/// <https://www.iana.org/assignments/capability-codes/capability-codes.xhtml#capability-codes-2>
#[allow(non_camel_case_types)]
#[derive(Debug, FromPrimitive, IntoPrimitive, PartialEq, Eq, Hash, Copy, Clone)]
#[repr(u8)]
pub enum BgpCapabilityType {
    MULTIPROTOCOL_EXTENSIONS_FOR_BGP_4 = 1,
    ROUTE_REFRESH_CAPABILITY_FOR_BGP_4 = 2,
    EXTENDED_NEXT_HOP_ENCODING = 5,
    GRACEFUL_RESTART_CAPABILITY = 64,
    SUPPORT_FOR_4_OCTET_AS_NUMBER_CAPABILITY = 65,
    ADD_PATH_CAPABILITY = 69,

    /// Catch-all type for any unassigned, deprecated, or reserved codes
    #[num_enum(catch_all)]
    Unknown(u8),
}

/// One capability from an OPEN optional parameter of type 2, kept raw so
/// supported ones can be echoed back byte for byte.
///
/// RFC3392: <https://datatracker.ietf.org/doc/html/rfc3392>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub code: BgpCapabilityType,
    pub value: Vec<u8>,
}

/// Multiprotocol Extensions capability - RFC 4760, Section 8
///
/// ```text
///      0       7      15      23      31
///      +-------+-------+-------+-------+
///      |      AFI      | Res.  | SAFI  |
///      +-------+-------+-------+-------+
/// ```
///
/// The family codes are kept raw: a peer may legitimately advertise
/// families this speaker does not track, and the capability is echoed
/// either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiprotocolExtensionsCapability {
    pub afi: u16,
    pub safi: u8,
}

impl MultiprotocolExtensionsCapability {
    pub fn parse(value: &[u8]) -> Result<Self, ParserError> {
        if value.len() != 4 {
            return Err(ParserError::ParseError(format!(
                "multiprotocol capability length {} is not 4",
                value.len()
            )));
        }
        Ok(MultiprotocolExtensionsCapability {
            afi: u16::from_be_bytes([value[0], value[1]]),
            safi: value[3],
        })
    }

    /// The (AFI, SAFI) pair when it is one this speaker knows about.
    pub fn family(&self) -> Option<(Afi, Safi)> {
        Some((Afi::try_from(self.afi).ok()?, Safi::try_from(self.safi).ok()?))
    }
}

/// 4-octet AS number capability - RFC 6793
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourOctetAsCapability {
    pub asn: u32,
}

impl FourOctetAsCapability {
    pub fn parse(value: &[u8]) -> Result<Self, ParserError> {
        if value.len() != 4 {
            return Err(ParserError::ParseError(format!(
                "4-octet AS capability length {} is not 4",
                value.len()
            )));
        }
        Ok(FourOctetAsCapability {
            asn: u32::from_be_bytes([value[0], value[1], value[2], value[3]]),
        })
    }
}
