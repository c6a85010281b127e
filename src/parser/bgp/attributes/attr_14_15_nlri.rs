use crate::error::ParserError;
use crate::models::{Afi, MpReachableNlri, MpUnreachableNlri, Safi};
use crate::parser::bgp::attributes::attr_03_next_hop::parse_mp_next_hop;
use crate::parser::{parse_nlri_list, ReadUtils};
use bytes::Bytes;
use log::{debug, warn};

///
/// <https://datatracker.ietf.org/doc/html/rfc4760#section-3>
/// The attribute is encoded as shown below:
/// ```text
/// +---------------------------------------------------------+
/// | Address Family Identifier (2 octets)                    |
/// +---------------------------------------------------------+
/// | Subsequent Address Family Identifier (1 octet)          |
/// +---------------------------------------------------------+
/// | Length of Next Hop Network Address (1 octet)            |
/// +---------------------------------------------------------+
/// | Network Address of Next Hop (variable)                  |
/// +---------------------------------------------------------+
/// | Reserved (1 octet)                                      |
/// +---------------------------------------------------------+
/// | Network Layer Reachability Information (variable)       |
/// +---------------------------------------------------------+
/// ```
///
/// Returns `Ok(None)` for address families this speaker does not track;
/// the attribute is consumed but nothing reaches the RIB.
pub fn parse_mp_reachable(mut input: Bytes) -> Result<Option<MpReachableNlri>, ParserError> {
    if input.len() < 5 {
        return Err(ParserError::ParseError(format!(
            "MP_REACH_NLRI attribute length {} below minimum of 5",
            input.len()
        )));
    }

    let afi_raw = input.read_u16()?;
    let safi_raw = input.read_u8()?;
    let next_hop_len = input.read_u8()? as usize;

    // IPv4, RD+IPv4, IPv6, IPv6 global + link-local
    if !matches!(next_hop_len, 4 | 12 | 16 | 32) {
        return Err(ParserError::ParseError(format!(
            "invalid MP next hop length: {}",
            next_hop_len
        )));
    }
    input.has_n_remaining(next_hop_len + 1)?;
    let next_hop = parse_mp_next_hop(input.split_to(next_hop_len))?;

    // skip the SNPA/reserved octet
    if input.read_u8()? != 0 {
        warn!("MP_REACH_NLRI reserved byte not 0");
    }

    if input.is_empty() {
        return Err(ParserError::ParseError(
            "MP_REACH_NLRI without NLRI".to_string(),
        ));
    }

    let (Ok(afi), Ok(safi)) = (Afi::try_from(afi_raw), Safi::try_from(safi_raw)) else {
        debug!(
            "skipping MP_REACH_NLRI for unrecognized family {}/{}",
            afi_raw, safi_raw
        );
        return Ok(None);
    };

    let prefixes = parse_nlri_list(input, afi)?;
    Ok(Some(MpReachableNlri {
        afi,
        safi,
        next_hop,
        prefixes,
    }))
}

/// <https://datatracker.ietf.org/doc/html/rfc4760#section-4>
///
/// An empty prefix list is valid; it is how peers signal End-of-RIB for a
/// family.
pub fn parse_mp_unreachable(mut input: Bytes) -> Result<Option<MpUnreachableNlri>, ParserError> {
    if input.len() < 3 {
        return Err(ParserError::ParseError(format!(
            "MP_UNREACH_NLRI attribute length {} below minimum of 3",
            input.len()
        )));
    }

    let afi_raw = input.read_u16()?;
    let safi_raw = input.read_u8()?;

    let (Ok(afi), Ok(safi)) = (Afi::try_from(afi_raw), Safi::try_from(safi_raw)) else {
        debug!(
            "skipping MP_UNREACH_NLRI for unrecognized family {}/{}",
            afi_raw, safi_raw
        );
        return Ok(None);
    };

    let prefixes = parse_nlri_list(input, afi)?;
    Ok(Some(MpUnreachableNlri { afi, safi, prefixes }))
}
