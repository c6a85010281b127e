use crate::error::ParserError;
use crate::parser::ReadUtils;
use bytes::Bytes;

pub fn parse_med(mut input: Bytes) -> Result<u32, ParserError> {
    if input.len() != 4 {
        return Err(ParserError::ParseError(format!(
            "MULTI_EXIT_DISC attribute length {} is not 4",
            input.len()
        )));
    }
    input.read_u32()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_med() {
        assert_eq!(
            parse_med(Bytes::from_static(&[0x00, 0x00, 0x00, 0x64])).unwrap(),
            100
        );
        assert!(parse_med(Bytes::from_static(&[0x00, 0x64])).is_err());
    }
}
