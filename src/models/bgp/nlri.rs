use crate::models::{Afi, NextHopAddress, Safi};
use ipnet::IpNet;

/// Decoded MP_REACH_NLRI attribute - RFC 4760, Section 3.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MpReachableNlri {
    pub afi: Afi,
    pub safi: Safi,
    pub next_hop: NextHopAddress,
    pub prefixes: Vec<IpNet>,
}

/// Decoded MP_UNREACH_NLRI attribute - RFC 4760, Section 4.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MpUnreachableNlri {
    pub afi: Afi,
    pub safi: Safi,
    pub prefixes: Vec<IpNet>,
}
