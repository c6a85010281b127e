/*!
Provides IO utility functions for reading bytes of different lengths and
converting them to the corresponding structs.
*/
use bytes::{Buf, BufMut, Bytes, BytesMut};
use ipnet::IpNet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::ParserError;
use crate::models::{Afi, Asn, AsnLength, Safi};

/// Checked big-endian reads over a [Bytes] buffer.
///
/// Every read verifies the remaining length first so a lying length field
/// surfaces as a [ParserError::TruncatedMsg] instead of a panic.
pub trait ReadUtils {
    fn has_n_remaining(&self, n: usize) -> Result<(), ParserError>;

    fn read_u8(&mut self) -> Result<u8, ParserError>;

    fn read_u16(&mut self) -> Result<u16, ParserError>;

    fn read_u32(&mut self) -> Result<u32, ParserError>;

    fn read_ipv4_address(&mut self) -> Result<Ipv4Addr, ParserError>;

    fn read_ipv6_address(&mut self) -> Result<Ipv6Addr, ParserError>;

    fn read_afi(&mut self) -> Result<Afi, ParserError>;

    fn read_safi(&mut self) -> Result<Safi, ParserError>;

    fn read_asn(&mut self, as_length: AsnLength) -> Result<Asn, ParserError>;

    fn read_nlri_prefix(&mut self, afi: Afi) -> Result<IpNet, ParserError>;
}

impl ReadUtils for Bytes {
    fn has_n_remaining(&self, n: usize) -> Result<(), ParserError> {
        if self.remaining() < n {
            return Err(ParserError::TruncatedMsg(format!(
                "expected {} more bytes but only {} remain",
                n,
                self.remaining()
            )));
        }
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8, ParserError> {
        self.has_n_remaining(1)?;
        Ok(self.get_u8())
    }

    fn read_u16(&mut self) -> Result<u16, ParserError> {
        self.has_n_remaining(2)?;
        Ok(self.get_u16())
    }

    fn read_u32(&mut self) -> Result<u32, ParserError> {
        self.has_n_remaining(4)?;
        Ok(self.get_u32())
    }

    fn read_ipv4_address(&mut self) -> Result<Ipv4Addr, ParserError> {
        Ok(Ipv4Addr::from(self.read_u32()?))
    }

    fn read_ipv6_address(&mut self) -> Result<Ipv6Addr, ParserError> {
        self.has_n_remaining(16)?;
        Ok(Ipv6Addr::from(self.get_u128()))
    }

    fn read_afi(&mut self) -> Result<Afi, ParserError> {
        Ok(Afi::try_from(self.read_u16()?)?)
    }

    fn read_safi(&mut self) -> Result<Safi, ParserError> {
        Ok(Safi::try_from(self.read_u8()?)?)
    }

    fn read_asn(&mut self, as_length: AsnLength) -> Result<Asn, ParserError> {
        match as_length {
            AsnLength::Bits16 => Ok(Asn::new_16bit(self.read_u16()?)),
            AsnLength::Bits32 => Ok(Asn::new_32bit(self.read_u32()?)),
        }
    }

    /// Read one announced/withdrawn prefix.
    ///
    /// The length in bits is 1 byte, followed by the minimal number of
    /// address bytes; bits past the prefix length are cleared.
    fn read_nlri_prefix(&mut self, afi: Afi) -> Result<IpNet, ParserError> {
        let bit_len = self.read_u8()?;
        if bit_len > afi.max_prefix_len() {
            return Err(ParserError::ParseError(format!(
                "invalid {:?} prefix length: {}",
                afi, bit_len
            )));
        }

        let byte_len: usize = (bit_len as usize + 7) / 8;
        self.has_n_remaining(byte_len)?;
        let addr: IpAddr = match afi {
            Afi::Ipv4 => {
                let mut buff = [0; 4];
                for i in 0..byte_len {
                    buff[i] = self.get_u8();
                }
                IpAddr::V4(Ipv4Addr::from(buff))
            }
            Afi::Ipv6 => {
                let mut buff = [0; 16];
                for i in 0..byte_len {
                    buff[i] = self.get_u8();
                }
                IpAddr::V6(Ipv6Addr::from(buff))
            }
        };
        let prefix = IpNet::new(addr, bit_len)
            .map_err(|_| ParserError::ParseError(format!("invalid prefix length: {}", bit_len)))?;
        Ok(prefix.trunc())
    }
}

/// Read a run of NLRI prefixes until the buffer is drained.
pub fn parse_nlri_list(mut input: Bytes, afi: Afi) -> Result<Vec<IpNet>, ParserError> {
    let mut prefixes = vec![];
    while input.remaining() > 0 {
        prefixes.push(input.read_nlri_prefix(afi)?);
    }
    Ok(prefixes)
}

/// Encode one prefix in NLRI form: a length octet followed by the minimal
/// number of address bytes.
pub fn encode_nlri_prefix(prefix: &IpNet) -> Bytes {
    let bit_len = prefix.prefix_len();
    let byte_len = (bit_len as usize + 7) / 8;
    let mut bytes = BytesMut::with_capacity(1 + byte_len);
    bytes.put_u8(bit_len);
    match prefix.trunc().addr() {
        IpAddr::V4(addr) => bytes.put_slice(&addr.octets()[..byte_len]),
        IpAddr::V6(addr) => bytes.put_slice(&addr.octets()[..byte_len]),
    }
    bytes.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_read_nlri_prefix() {
        let mut data = Bytes::from(vec![
            0x18, // 24 bits prefix length
            0xC0, 0x00, 0x02, // 192.0.2
        ]);
        let prefix = data.read_nlri_prefix(Afi::Ipv4).unwrap();
        assert_eq!(prefix, IpNet::from_str("192.0.2.0/24").unwrap());
        assert_eq!(data.remaining(), 0);
    }

    #[test]
    fn test_read_nlri_prefix_normalizes_trailing_bits() {
        let mut data = Bytes::from(vec![
            0x14, // 20 bits prefix length
            0x0A, 0x01, 0xFF, // stray bits past /20
        ]);
        let prefix = data.read_nlri_prefix(Afi::Ipv4).unwrap();
        assert_eq!(prefix, IpNet::from_str("10.1.240.0/20").unwrap());
    }

    #[test]
    fn test_read_nlri_prefix_length_errors() {
        let mut data = Bytes::from(vec![0x21, 0x0A, 0x00, 0x00, 0x00, 0x00]);
        assert!(matches!(
            data.read_nlri_prefix(Afi::Ipv4),
            Err(ParserError::ParseError(_))
        ));

        // declared 24 bits but only two address bytes present
        let mut data = Bytes::from(vec![0x18, 0x0A, 0x00]);
        assert!(matches!(
            data.read_nlri_prefix(Afi::Ipv4),
            Err(ParserError::TruncatedMsg(_))
        ));
    }

    #[test]
    fn test_parse_nlri_list() {
        let data = Bytes::from(vec![
            0x08, 0x0A, // 10.0.0.0/8
            0x10, 0x0A, 0x01, // 10.1.0.0/16
            0x00, // 0.0.0.0/0
        ]);
        let prefixes = parse_nlri_list(data, Afi::Ipv4).unwrap();
        assert_eq!(
            prefixes,
            vec![
                IpNet::from_str("10.0.0.0/8").unwrap(),
                IpNet::from_str("10.1.0.0/16").unwrap(),
                IpNet::from_str("0.0.0.0/0").unwrap(),
            ]
        );
    }

    #[test]
    fn test_parse_nlri_list_ipv6() {
        let data = Bytes::from(vec![
            0x20, 0x20, 0x01, 0x0d, 0xb8, // 2001:db8::/32
        ]);
        let prefixes = parse_nlri_list(data, Afi::Ipv6).unwrap();
        assert_eq!(prefixes, vec![IpNet::from_str("2001:db8::/32").unwrap()]);
    }

    #[test]
    fn test_encode_nlri_prefix() {
        let encoded = encode_nlri_prefix(&IpNet::from_str("192.0.2.0/24").unwrap());
        assert_eq!(&encoded[..], &[0x18, 0xc0, 0x00, 0x02]);

        let encoded = encode_nlri_prefix(&IpNet::from_str("2001:db8::/32").unwrap());
        assert_eq!(&encoded[..], &[0x20, 0x20, 0x01, 0x0d, 0xb8]);

        // a /20 takes three address bytes, the last one masked
        let mut decoded = encode_nlri_prefix(&IpNet::from_str("10.1.240.0/20").unwrap());
        assert_eq!(&decoded[..], &[0x14, 0x0a, 0x01, 0xf0]);
        assert_eq!(
            decoded.read_nlri_prefix(Afi::Ipv4).unwrap(),
            IpNet::from_str("10.1.240.0/20").unwrap()
        );
    }
}
