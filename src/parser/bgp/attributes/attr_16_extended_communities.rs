//! BGP Extended Communities Attribute
//!
//! RFC4360: <https://datatracker.ietf.org/doc/html/rfc4360>
//! IANA Codes: <https://www.iana.org/assignments/bgp-extended-communities/bgp-extended-communities.xhtml>
use crate::error::ParserError;
use crate::models::*;
use crate::parser::ReadUtils;
use bytes::{Buf, Bytes};
use std::net::Ipv4Addr;

pub fn parse_extended_communities(
    mut input: Bytes,
) -> Result<Option<ExtCommunityList>, ParserError> {
    if input.is_empty() {
        return Ok(None);
    }
    if input.len() % 8 != 0 {
        return Err(ParserError::AttributeError(format!(
            "EXT_COMMUNITIES attribute length {} is not a multiple of 8",
            input.len()
        )));
    }

    let mut communities = Vec::with_capacity(input.len() / 8);
    while input.remaining() > 0 {
        let ec_type_u8 = input.read_u8()?;
        let ec: ExtendedCommunity = match ExtendedCommunityType::from(ec_type_u8) {
            ExtendedCommunityType::TransitiveTwoOctetAs
            | ExtendedCommunityType::NonTransitiveTwoOctetAs => {
                let subtype = input.read_u8()?;
                let global_admin = Asn::new_16bit(input.read_u16()?);
                let mut local_admin = [0u8; 4];
                for b in local_admin.iter_mut() {
                    *b = input.read_u8()?;
                }
                let value = TwoOctetAsExtCommunity {
                    subtype,
                    global_admin,
                    local_admin,
                };
                if ec_type_u8 < 0x40 {
                    ExtendedCommunity::TransitiveTwoOctetAs(value)
                } else {
                    ExtendedCommunity::NonTransitiveTwoOctetAs(value)
                }
            }
            ExtendedCommunityType::TransitiveIpv4Addr
            | ExtendedCommunityType::NonTransitiveIpv4Addr => {
                let subtype = input.read_u8()?;
                let global_admin = Ipv4Addr::from(input.read_u32()?);
                let mut local_admin = [0u8; 2];
                for b in local_admin.iter_mut() {
                    *b = input.read_u8()?;
                }
                let value = Ipv4AddrExtCommunity {
                    subtype,
                    global_admin,
                    local_admin,
                };
                if ec_type_u8 < 0x40 {
                    ExtendedCommunity::TransitiveIpv4Addr(value)
                } else {
                    ExtendedCommunity::NonTransitiveIpv4Addr(value)
                }
            }
            ExtendedCommunityType::TransitiveFourOctetAs
            | ExtendedCommunityType::NonTransitiveFourOctetAs => {
                let subtype = input.read_u8()?;
                let global_admin = Asn::new_32bit(input.read_u32()?);
                let mut local_admin = [0u8; 2];
                for b in local_admin.iter_mut() {
                    *b = input.read_u8()?;
                }
                let value = FourOctetAsExtCommunity {
                    subtype,
                    global_admin,
                    local_admin,
                };
                if ec_type_u8 < 0x40 {
                    ExtendedCommunity::TransitiveFourOctetAs(value)
                } else {
                    ExtendedCommunity::NonTransitiveFourOctetAs(value)
                }
            }
            ExtendedCommunityType::TransitiveOpaque
            | ExtendedCommunityType::NonTransitiveOpaque => {
                let subtype = input.read_u8()?;
                let mut value = [0u8; 6];
                for b in value.iter_mut() {
                    *b = input.read_u8()?;
                }
                let value = OpaqueExtCommunity { subtype, value };
                if ec_type_u8 < 0x40 {
                    ExtendedCommunity::TransitiveOpaque(value)
                } else {
                    ExtendedCommunity::NonTransitiveOpaque(value)
                }
            }
            ExtendedCommunityType::Unknown(_) => {
                let mut buffer = [0u8; 8];
                buffer[0] = ec_type_u8;
                for b in buffer.iter_mut().skip(1) {
                    *b = input.read_u8()?;
                }
                ExtendedCommunity::Raw(buffer)
            }
        };
        communities.push(ec);
    }

    Ok(Some(communities))
}
