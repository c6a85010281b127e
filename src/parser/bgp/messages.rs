use bytes::{Buf, Bytes, BytesMut};

use crate::error::ParserError;
use crate::models::*;
use crate::parser::bgp::attributes::parse_attributes;
use crate::parser::{parse_nlri_list, ReadUtils};

/// BGP message
///
/// Format:
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                                                               +
/// |                                                               |
/// +                                                               +
/// |                           Marker                              |
/// +                                                               +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |          Length               |      Type     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone)]
pub struct BgpFrame {
    pub msg_type: BgpMessageType,
    pub payload: Bytes,
}

/// Returns true iff all 16 marker bytes are 0xFF (RFC 4271, Section 4.1).
pub fn marker_check(header: &[u8]) -> bool {
    header.len() >= BGP_MARKER_SIZE && header[..BGP_MARKER_SIZE].iter().all(|b| *b == 0xff)
}

/// Reassembles the TCP byte stream into whole BGP messages.
///
/// Bytes from `recv` are appended with [FrameAssembler::push];
/// [FrameAssembler::next_frame] then peels off one complete message at a
/// time. An incomplete trailing message stays buffered for the next read.
/// The buffer grows to fit the largest fragment seen and is never shrunk.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: BytesMut,
}

impl FrameAssembler {
    pub fn new() -> Self {
        FrameAssembler {
            buf: BytesMut::with_capacity(BGP_MAX_MESSAGE_SIZE),
        }
    }

    /// Append freshly received bytes to the reassembly buffer.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next complete message, or `Ok(None)` when fewer than a
    /// header's worth of bytes remain or the declared length has not fully
    /// arrived yet.
    pub fn next_frame(&mut self) -> Result<Option<BgpFrame>, ParserError> {
        if self.buf.len() < BGP_HEADER_SIZE {
            return Ok(None);
        }

        if !marker_check(&self.buf) {
            return Err(ParserError::ParseError("marker check failed".to_string()));
        }

        /*
        This 2-octet unsigned integer indicates the total length of the
        message, including the header in octets.  Thus, it allows one
        to locate the (Marker field of the) next message in the TCP
        stream.  The value of the Length field MUST always be at least
        19 and no greater than 4096.
        */
        let length = u16::from_be_bytes([self.buf[16], self.buf[17]]) as usize;
        if !(BGP_HEADER_SIZE..=BGP_MAX_MESSAGE_SIZE).contains(&length) {
            return Err(ParserError::ParseError(format!(
                "invalid BGP message length {}",
                length
            )));
        }

        if self.buf.len() < length {
            return Ok(None);
        }

        let mut frame = self.buf.split_to(length).freeze();
        let msg_type = BgpMessageType::try_from(frame[18])?;
        let payload = frame.split_off(BGP_HEADER_SIZE);
        Ok(Some(BgpFrame { msg_type, payload }))
    }

    /// Bytes of the incomplete trailing message still buffered.
    pub fn residual(&self) -> usize {
        self.buf.len()
    }

    /// Drop any buffered bytes; used when a peer goes away mid-message.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

/// Parse a BGP OPEN message payload (header already stripped).
///
/// Capabilities from every type-2 optional parameter are collected in wire
/// order; other parameter types are skipped over.
pub fn parse_bgp_open_message(mut input: Bytes) -> Result<BgpOpenMessage, ParserError> {
    let version = input.read_u8()?;
    let asn = Asn::new_16bit(input.read_u16()?);
    let hold_time = input.read_u16()?;
    let identifier = input.read_ipv4_address()?;
    let opt_params_len = input.read_u8()? as usize;

    input.has_n_remaining(opt_params_len)?;
    let mut params = input.split_to(opt_params_len);

    let mut capabilities = vec![];
    while params.remaining() > 0 {
        let param_type = params.read_u8()?;
        let param_len = params.read_u8()? as usize;
        params.has_n_remaining(param_len)?;
        let mut value = params.split_to(param_len);

        // https://tools.ietf.org/html/rfc3392
        // https://www.iana.org/assignments/bgp-parameters/bgp-parameters.xhtml#bgp-parameters-11
        if param_type != BGP_PARAM_CAPABILITY {
            continue;
        }

        // one parameter may carry several capabilities back to back
        while value.remaining() > 0 {
            let code = BgpCapabilityType::from(value.read_u8()?);
            let len = value.read_u8()? as usize;
            value.has_n_remaining(len)?;
            capabilities.push(Capability {
                code,
                value: value.split_to(len).to_vec(),
            });
        }
    }

    Ok(BgpOpenMessage {
        version,
        asn,
        hold_time,
        identifier,
        capabilities,
    })
}

/// Parse a BGP UPDATE message payload.
///
/// `four_byte_as` selects the AS_PATH number width the peer negotiated, and
/// `external_peer` suppresses LOCAL_PREF per RFC 4271, Section 5.1.5.
pub fn parse_bgp_update_message(
    mut input: Bytes,
    four_byte_as: bool,
    external_peer: bool,
) -> Result<BgpUpdateMessage, ParserError> {
    // AFI for routes outside the MP attributes is IPv4 only
    let afi = Afi::Ipv4;

    let withdrawn_length = input.read_u16()? as usize;
    input.has_n_remaining(withdrawn_length)?;
    let withdrawn_prefixes = parse_nlri_list(input.split_to(withdrawn_length), afi)?;

    let attribute_length = input.read_u16()? as usize;
    input.has_n_remaining(attribute_length)?;
    let (attributes, mp_reachable, mp_unreachable) =
        parse_attributes(input.split_to(attribute_length), four_byte_as, external_peer)?;

    // whatever remains is the announced IPv4 NLRI
    let announced_prefixes = parse_nlri_list(input, afi)?;

    Ok(BgpUpdateMessage {
        withdrawn_prefixes,
        attributes,
        announced_prefixes,
        mp_reachable,
        mp_unreachable,
    })
}
