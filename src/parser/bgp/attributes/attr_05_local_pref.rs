use crate::error::ParserError;
use crate::parser::ReadUtils;
use bytes::Bytes;

pub fn parse_local_pref(mut input: Bytes) -> Result<u32, ParserError> {
    if input.len() != 4 {
        return Err(ParserError::ParseError(format!(
            "LOCAL_PREF attribute length {} is not 4",
            input.len()
        )));
    }
    input.read_u32()
}
