use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Next-hop network address carried in an MP_REACH_NLRI attribute.
///
/// The wire length decides the shape: 4 bytes for IPv4, 12 for a VPN route
/// distinguisher followed by IPv4, 16 for IPv6, and 32 for a global IPv6
/// address paired with its link-local address.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum NextHopAddress {
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Ipv6LinkLocal(Ipv6Addr, Ipv6Addr),
}

impl NextHopAddress {
    /// Returns the address that this next hop points to, dropping the
    /// link-local part when both are present.
    pub const fn addr(&self) -> IpAddr {
        match self {
            NextHopAddress::Ipv4(addr) => IpAddr::V4(*addr),
            NextHopAddress::Ipv6(addr) => IpAddr::V6(*addr),
            NextHopAddress::Ipv6LinkLocal(addr, _) => IpAddr::V6(*addr),
        }
    }
}

impl Display for NextHopAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NextHopAddress::Ipv4(v) => write!(f, "{v}"),
            NextHopAddress::Ipv6(v) => write!(f, "{v}"),
            NextHopAddress::Ipv6LinkLocal(v1, _v2) => write!(f, "{v1}"),
        }
    }
}
