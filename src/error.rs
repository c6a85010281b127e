/*!
error module defines the error types used in ribview.
*/
use crate::models::{Afi, BgpMessageType, Origin, Safi};
use num_enum::TryFromPrimitiveError;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::{error::Error, fmt, io};

/// Errors raised while decoding BGP wire data.
#[derive(Debug)]
pub enum ParserError {
    IoError(io::Error),
    EofError(io::Error),
    /// Wire-format violation. Fatal for the session that produced it.
    ParseError(String),
    /// Declared length points past the available bytes.
    TruncatedMsg(String),
    /// Well-formed but outside what this speaker implements.
    Unsupported(String),
    /// Problem inside a single path attribute. The rest of the UPDATE is
    /// discarded but the session stays up.
    AttributeError(String),
}

impl Error for ParserError {}

impl Display for ParserError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::IoError(e) => write!(f, "Error: {e}"),
            ParserError::EofError(e) => write!(f, "Error: {e}"),
            ParserError::ParseError(s) => write!(f, "Error: {s}"),
            ParserError::TruncatedMsg(s) => write!(f, "Error: {s}"),
            ParserError::Unsupported(s) => write!(f, "Error: {s}"),
            ParserError::AttributeError(s) => write!(f, "Error: {s}"),
        }
    }
}

impl From<io::Error> for ParserError {
    fn from(io_error: io::Error) -> Self {
        match io_error.kind() {
            ErrorKind::UnexpectedEof => ParserError::EofError(io_error),
            _ => ParserError::IoError(io_error),
        }
    }
}

impl From<TryFromPrimitiveError<BgpMessageType>> for ParserError {
    fn from(value: TryFromPrimitiveError<BgpMessageType>) -> Self {
        ParserError::ParseError(format!("unknown BGP message type: {}", value.number))
    }
}

impl From<TryFromPrimitiveError<Afi>> for ParserError {
    fn from(value: TryFromPrimitiveError<Afi>) -> Self {
        ParserError::Unsupported(format!("unknown AFI type: {}", value.number))
    }
}

impl From<TryFromPrimitiveError<Safi>> for ParserError {
    fn from(value: TryFromPrimitiveError<Safi>) -> Self {
        ParserError::Unsupported(format!("unknown SAFI type: {}", value.number))
    }
}

impl From<TryFromPrimitiveError<Origin>> for ParserError {
    fn from(value: TryFromPrimitiveError<Origin>) -> Self {
        ParserError::ParseError(format!("invalid origin value: {}", value.number))
    }
}

/// Session-level outcome of a peer exchange. Every variant tears the peer
/// down and returns the listener to `accept`.
#[derive(Debug)]
pub enum SessionError {
    /// Wire-format violation: bad marker, impossible length, invalid AS4
    /// reconciliation, message out of state.
    Malformed(String),
    /// Valid BGP that this speaker does not support (version != 4, 4-octet
    /// local ASN without the peer capability).
    Unsupported(String),
    /// The peer sent a NOTIFICATION; the session is over.
    Notification,
    Io(io::Error),
}

impl Error for SessionError {}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Malformed(s) => write!(f, "malformed BGP packet ({s})"),
            SessionError::Unsupported(s) => write!(f, "unsupported BGP option ({s})"),
            SessionError::Notification => write!(f, "NOTIFICATION received"),
            SessionError::Io(e) => write!(f, "socket error ({e})"),
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(error: io::Error) -> Self {
        SessionError::Io(error)
    }
}

impl From<ParserError> for SessionError {
    fn from(error: ParserError) -> Self {
        match error {
            ParserError::IoError(e) | ParserError::EofError(e) => SessionError::Io(e),
            ParserError::Unsupported(s) => SessionError::Unsupported(s),
            other => SessionError::Malformed(other.to_string()),
        }
    }
}
