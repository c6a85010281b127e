use crate::error::ParserError;
use crate::models::NextHopAddress;
use crate::parser::ReadUtils;
use bytes::{Buf, Bytes};
use std::net::Ipv4Addr;

pub fn parse_next_hop(mut input: Bytes) -> Result<Ipv4Addr, ParserError> {
    if input.len() != 4 {
        return Err(ParserError::AttributeError(format!(
            "NEXT_HOP attribute length {} is not 4",
            input.len()
        )));
    }
    input.read_ipv4_address()
}

/// Decode the next-hop field of an MP_REACH_NLRI attribute. The declared
/// length selects the shape; anything else was rejected by the caller.
pub fn parse_mp_next_hop(mut input: Bytes) -> Result<NextHopAddress, ParserError> {
    Ok(match input.len() {
        4 => NextHopAddress::Ipv4(input.read_ipv4_address()?),
        12 => {
            // an 8-byte route distinguisher precedes the IPv4 address
            input.advance(8);
            NextHopAddress::Ipv4(input.read_ipv4_address()?)
        }
        16 => NextHopAddress::Ipv6(input.read_ipv6_address()?),
        32 => NextHopAddress::Ipv6LinkLocal(
            input.read_ipv6_address()?,
            input.read_ipv6_address()?,
        ),
        len => {
            return Err(ParserError::ParseError(format!(
                "invalid MP next hop length: {}",
                len
            )))
        }
    })
}
