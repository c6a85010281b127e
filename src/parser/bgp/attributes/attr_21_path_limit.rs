use crate::error::ParserError;
use crate::models::PathLimit;
use crate::parser::ReadUtils;
use bytes::Bytes;

/// AS_PATHLIMIT: an upper bound on path length plus the AS that set it.
///
/// <https://datatracker.ietf.org/doc/html/draft-ietf-idr-as-pathlimit-03>
pub fn parse_path_limit(mut input: Bytes) -> Result<PathLimit, ParserError> {
    if input.len() != 5 {
        return Err(ParserError::AttributeError(format!(
            "AS_PATHLIMIT attribute length {} is not 5",
            input.len()
        )));
    }
    Ok(PathLimit {
        ttl: input.read_u8()?,
        asn: input.read_u32()?,
    })
}
