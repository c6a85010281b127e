use crate::error::ParserError;
use crate::models::{AsPath, AsPathSegment, AsnLength};
use crate::parser::ReadUtils;
use bytes::Bytes;
use num_enum::TryFromPrimitive;

#[allow(non_camel_case_types)]
#[derive(Debug, TryFromPrimitive)]
#[repr(u8)]
enum AsSegmentType {
    AS_PATH_AS_SET = 1,
    AS_PATH_AS_SEQUENCE = 2,
    // https://datatracker.ietf.org/doc/html/rfc5065
    AS_PATH_CONFED_SEQUENCE = 3,
    AS_PATH_CONFED_SET = 4,
}

/// Parse an AS_PATH (or AS4_PATH) attribute value.
///
/// `asn_len` reflects the session's negotiated width: a peer that
/// advertised the 4-octet AS capability encodes AS_PATH with 32-bit
/// numbers, everyone else with 16-bit ones. AS4_PATH is always 32-bit.
pub fn parse_as_path(mut input: Bytes, asn_len: AsnLength) -> Result<AsPath, ParserError> {
    let mut segments = Vec::with_capacity(1);
    while !input.is_empty() {
        segments.push(parse_as_path_segment(&mut input, asn_len)?);
    }

    Ok(AsPath::from_segments(segments))
}

fn parse_as_path_segment(
    input: &mut Bytes,
    asn_len: AsnLength,
) -> Result<AsPathSegment, ParserError> {
    let segment_type = AsSegmentType::try_from(input.read_u8()?).map_err(|e| {
        ParserError::AttributeError(format!("unknown AS path segment type: {}", e.number))
    })?;
    let count = input.read_u8()? as usize;
    input.has_n_remaining(count * asn_len.byte_len())?;

    let mut path = Vec::with_capacity(count);
    for _ in 0..count {
        path.push(input.read_asn(asn_len)?);
    }

    Ok(match segment_type {
        AsSegmentType::AS_PATH_AS_SET => AsPathSegment::AsSet(path),
        AsSegmentType::AS_PATH_AS_SEQUENCE => AsPathSegment::AsSequence(path),
        AsSegmentType::AS_PATH_CONFED_SEQUENCE => AsPathSegment::ConfedSequence(path),
        AsSegmentType::AS_PATH_CONFED_SET => AsPathSegment::ConfedSet(path),
    })
}
