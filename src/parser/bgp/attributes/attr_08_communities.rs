use crate::error::ParserError;
use crate::models::{Asn, Community, CommunityList};
use crate::parser::ReadUtils;
use bytes::{Buf, Bytes};

/// Parse a COMMUNITIES attribute (RFC 1997). A zero-length attribute means
/// no communities at all.
pub fn parse_regular_communities(mut input: Bytes) -> Result<Option<CommunityList>, ParserError> {
    const COMMUNITY_NO_EXPORT: u32 = 0xFFFFFF01;
    const COMMUNITY_NO_ADVERTISE: u32 = 0xFFFFFF02;
    const COMMUNITY_NO_EXPORT_SUBCONFED: u32 = 0xFFFFFF03;

    if input.is_empty() {
        return Ok(None);
    }
    if input.len() % 4 != 0 {
        return Err(ParserError::AttributeError(format!(
            "COMMUNITIES attribute length {} is not a multiple of 4",
            input.len()
        )));
    }

    let mut communities = Vec::with_capacity(input.len() / 4);
    while input.remaining() > 0 {
        let community_val = input.read_u32()?;
        communities.push(match community_val {
            COMMUNITY_NO_EXPORT => Community::NoExport,
            COMMUNITY_NO_ADVERTISE => Community::NoAdvertise,
            COMMUNITY_NO_EXPORT_SUBCONFED => Community::NoExportSubConfed,
            value => {
                let asn = ((value >> 16) & 0xffff) as u16;
                let data = (value & 0xffff) as u16;
                Community::Custom(Asn::new_16bit(asn), data)
            }
        });
    }

    Ok(Some(communities))
}
