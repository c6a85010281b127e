mod attr_01_origin;
mod attr_02_17_as_path;
mod attr_03_next_hop;
mod attr_04_med;
mod attr_05_local_pref;
mod attr_08_communities;
mod attr_14_15_nlri;
mod attr_16_extended_communities;
mod attr_21_path_limit;

use bytes::Bytes;
use log::debug;

use crate::error::ParserError;
use crate::models::*;
use crate::parser::bgp::attributes::attr_01_origin::parse_origin;
use crate::parser::bgp::attributes::attr_02_17_as_path::parse_as_path;
use crate::parser::bgp::attributes::attr_03_next_hop::parse_next_hop;
use crate::parser::bgp::attributes::attr_04_med::parse_med;
use crate::parser::bgp::attributes::attr_05_local_pref::parse_local_pref;
use crate::parser::bgp::attributes::attr_08_communities::parse_regular_communities;
use crate::parser::bgp::attributes::attr_14_15_nlri::{parse_mp_reachable, parse_mp_unreachable};
use crate::parser::bgp::attributes::attr_16_extended_communities::parse_extended_communities;
use crate::parser::bgp::attributes::attr_21_path_limit::parse_path_limit;
use crate::parser::ReadUtils;

/// Walk the path attribute section of one UPDATE.
///
/// Each attribute is framed as `flags (1) | type (1) | length (1 or 2)`;
/// the extended-length flag widens the length field to two octets. Types
/// outside the recognized set are skipped without inspection.
///
/// After the walk, an AS4_PATH is reconciled into AS_PATH when the session
/// runs with 2-octet AS numbers; a peer that negotiated the 4-octet
/// capability already sent full-width numbers in AS_PATH, making AS4_PATH
/// redundant (RFC 6793, Section 4.2.3).
pub fn parse_attributes(
    mut input: Bytes,
    four_byte_as: bool,
    external_peer: bool,
) -> Result<
    (
        PathAttributes,
        Option<MpReachableNlri>,
        Option<MpUnreachableNlri>,
    ),
    ParserError,
> {
    let asn_len = if four_byte_as {
        AsnLength::Bits32
    } else {
        AsnLength::Bits16
    };

    let mut attrs = PathAttributes::default();
    let mut mp_reachable = None;
    let mut mp_unreachable = None;
    let mut as4_path: Option<AsPath> = None;

    while !input.is_empty() {
        if input.len() < 3 {
            return Err(ParserError::ParseError(
                "attribute header truncated".to_string(),
            ));
        }
        let flags = AttrFlags::from_bits_retain(input.read_u8()?);
        let attr_type = AttrType::from(input.read_u8()?);
        let length = if flags.contains(AttrFlags::EXTENDED) {
            input.read_u16()? as usize
        } else {
            input.read_u8()? as usize
        };
        input.has_n_remaining(length)?;
        let value = input.split_to(length);

        match attr_type {
            AttrType::ORIGIN => attrs.origin = parse_origin(value)?,
            AttrType::AS_PATH => attrs.as_path = Some(parse_as_path(value, asn_len)?),
            AttrType::AS4_PATH => as4_path = Some(parse_as_path(value, AsnLength::Bits32)?),
            AttrType::NEXT_HOP => attrs.next_hop = Some(parse_next_hop(value)?),
            AttrType::MULTI_EXIT_DISCRIMINATOR => attrs.med = Some(parse_med(value)?),
            AttrType::LOCAL_PREFERENCE => {
                /* If it is contained in an UPDATE message that is received
                from an external peer, then this attribute MUST be ignored
                by the receiving speaker. */
                if !external_peer {
                    attrs.local_pref = Some(parse_local_pref(value)?);
                }
            }
            AttrType::COMMUNITIES => attrs.communities = parse_regular_communities(value)?,
            AttrType::EXTENDED_COMMUNITIES => {
                attrs.ext_communities = parse_extended_communities(value)?
            }
            AttrType::AS_PATHLIMIT => attrs.path_limit = Some(parse_path_limit(value)?),
            AttrType::MP_REACHABLE_NLRI => mp_reachable = parse_mp_reachable(value)?,
            AttrType::MP_UNREACHABLE_NLRI => mp_unreachable = parse_mp_unreachable(value)?,
            unknown => debug!("skipping attribute type {:?}", unknown),
        }
    }

    if let Some(as4_path) = as4_path {
        if !four_byte_as {
            match attrs.as_path.take() {
                Some(as_path) => {
                    attrs.as_path = Some(AsPath::reconcile_as4(&as_path, &as4_path));
                }
                // AS4_PATH is only meaningful alongside AS_PATH
                None => {
                    return Err(ParserError::ParseError(
                        "AS4_PATH without AS_PATH".to_string(),
                    ))
                }
            }
        }
    }

    Ok((attrs, mp_reachable, mp_unreachable))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attributes_full_set() {
        let data = Bytes::from_static(&[
            0x40, 0x01, 0x01, 0x00, // ORIGIN: IGP
            0x40, 0x02, 0x04, 0x02, 0x01, 0xfd, 0xe9, // AS_PATH: 65001
            0x40, 0x03, 0x04, 0xc0, 0x00, 0x02, 0x01, // NEXT_HOP: 192.0.2.1
            0x80, 0x04, 0x04, 0x00, 0x00, 0x00, 0x64, // MED: 100
            0xc0, 0x08, 0x04, 0xfd, 0xe8, 0x00, 0x7b, // COMMUNITIES: 65000:123
        ]);
        let (attrs, mp_reach, mp_unreach) = parse_attributes(data, false, true).unwrap();
        assert_eq!(attrs.origin, Origin::IGP);
        assert_eq!(attrs.as_path, Some(AsPath::from_sequence([65001])));
        assert_eq!(attrs.next_hop, Some(std::net::Ipv4Addr::new(192, 0, 2, 1)));
        assert_eq!(attrs.med, Some(100));
        assert_eq!(
            attrs.communities,
            Some(vec![Community::Custom(Asn::new_16bit(65000), 123)])
        );
        assert!(mp_reach.is_none());
        assert!(mp_unreach.is_none());
    }

    #[test]
    fn test_extended_length_flag() {
        let data = Bytes::from_static(&[
            0x50, 0x01, 0x00, 0x01, 0x00, // ORIGIN with a two-octet length field
        ]);
        let (attrs, _, _) = parse_attributes(data, false, true).unwrap();
        assert_eq!(attrs.origin, Origin::IGP);
    }

    #[test]
    fn test_local_pref_ignored_from_external_peer() {
        let data = Bytes::from_static(&[
            0x40, 0x05, 0x04, 0x00, 0x00, 0x00, 0xc8, // LOCAL_PREF: 200
        ]);
        let (attrs, _, _) = parse_attributes(data.clone(), false, true).unwrap();
        assert_eq!(attrs.local_pref, None);

        let (attrs, _, _) = parse_attributes(data, false, false).unwrap();
        assert_eq!(attrs.local_pref, Some(200));
    }

    #[test]
    fn test_unknown_attribute_skipped() {
        let data = Bytes::from_static(&[
            0xc0, 0x20, 0x04, 0x01, 0x02, 0x03, 0x04, // type 32, untracked
            0x40, 0x01, 0x01, 0x02, // ORIGIN: INCOMPLETE
        ]);
        let (attrs, _, _) = parse_attributes(data, false, true).unwrap();
        assert_eq!(attrs.origin, Origin::INCOMPLETE);
    }

    #[test]
    fn test_attribute_length_overrun() {
        let data = Bytes::from_static(&[
            0x40, 0x01, 0x05, 0x00, // ORIGIN claiming 5 bytes with 1 present
        ]);
        assert!(matches!(
            parse_attributes(data, false, true),
            Err(ParserError::TruncatedMsg(_))
        ));
    }

    #[test]
    fn test_as4_path_reconciled_for_two_byte_session() {
        let data = Bytes::from_static(&[
            // AS_PATH: 65001 23456
            0x40, 0x02, 0x06, 0x02, 0x02, 0xfd, 0xe9, 0x5b, 0xa0, //
            // AS4_PATH: 70000
            0xc0, 0x11, 0x06, 0x02, 0x01, 0x00, 0x01, 0x11, 0x70,
        ]);
        let (attrs, _, _) = parse_attributes(data, false, true).unwrap();
        assert_eq!(attrs.as_path, Some(AsPath::from_sequence([65001, 70000])));
    }

    #[test]
    fn test_as4_path_dropped_for_four_byte_session() {
        let data = Bytes::from_static(&[
            // AS_PATH with 32-bit numbers: 65001 70000
            0x40, 0x02, 0x0a, 0x02, 0x02, 0x00, 0x00, 0xfd, 0xe9, 0x00, 0x01, 0x11, 0x70, //
            // AS4_PATH: 70000
            0xc0, 0x11, 0x06, 0x02, 0x01, 0x00, 0x01, 0x11, 0x70,
        ]);
        let (attrs, _, _) = parse_attributes(data, true, true).unwrap();
        assert_eq!(attrs.as_path, Some(AsPath::from_sequence([65001, 70000])));
    }

    #[test]
    fn test_as4_path_without_as_path() {
        let data = Bytes::from_static(&[
            0xc0, 0x11, 0x06, 0x02, 0x01, 0x00, 0x01, 0x11, 0x70, // AS4_PATH alone
        ]);
        assert!(matches!(
            parse_attributes(data, false, true),
            Err(ParserError::ParseError(_))
        ));
    }

    #[test]
    fn test_mp_attributes_forwarded() {
        let data = Bytes::from_static(&[
            0x80, 0x0f, 0x08, // MP_UNREACH_NLRI, length 8
            0x00, 0x02, 0x01, // IPv6 unicast
            0x20, 0x20, 0x01, 0x0d, 0xb8, // 2001:db8::/32
        ]);
        let (_, mp_reach, mp_unreach) = parse_attributes(data, false, true).unwrap();
        assert!(mp_reach.is_none());
        let mp_unreach = mp_unreach.unwrap();
        assert_eq!(mp_unreach.afi, Afi::Ipv6);
        assert_eq!(mp_unreach.prefixes.len(), 1);
    }
}
