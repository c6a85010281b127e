use crate::error::ParserError;
use crate::models::Origin;
use crate::parser::ReadUtils;
use bytes::Bytes;

pub fn parse_origin(mut input: Bytes) -> Result<Origin, ParserError> {
    if input.len() != 1 {
        return Err(ParserError::ParseError(format!(
            "ORIGIN attribute length {} is not 1",
            input.len()
        )));
    }
    Ok(Origin::try_from(input.read_u8()?)?)
}
