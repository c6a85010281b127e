//! BGP path attribute structs
use crate::interner::InternKey;
use crate::models::{AsPath, CommunityList, ExtCommunityList};
use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;

bitflags! {
    /// The high-order bit (bit 0) of the Attribute Flags octet is the
    /// Optional bit.  It defines whether the attribute is optional (if
    /// set to 1) or well-known (if set to 0).
    ///
    /// The second high-order bit (bit 1) of the Attribute Flags octet
    /// is the Transitive bit.  It defines whether an optional
    /// attribute is transitive (if set to 1) or non-transitive (if set
    /// to 0).
    ///
    /// The third high-order bit (bit 2) of the Attribute Flags octet
    /// is the Partial bit.  It defines whether the information
    /// contained in the optional transitive attribute is partial (if
    /// set to 1) or complete (if set to 0).
    ///
    /// The fourth high-order bit (bit 3) of the Attribute Flags octet
    /// is the Extended Length bit.  It defines whether the Attribute
    /// Length is one octet (if set to 0) or two octets (if set to 1).
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct AttrFlags: u8 {
        const OPTIONAL   = 0b10000000;
        const TRANSITIVE = 0b01000000;
        const PARTIAL    = 0b00100000;
        const EXTENDED   = 0b00010000;
    }
}

/// Attribute types recognized by this speaker.
///
/// Everything else is carried over unread. Full list at IANA:
/// <https://www.iana.org/assignments/bgp-parameters/bgp-parameters.xhtml#bgp-parameters-2>
#[allow(non_camel_case_types)]
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum AttrType {
    ORIGIN,
    AS_PATH,
    NEXT_HOP,
    MULTI_EXIT_DISCRIMINATOR,
    LOCAL_PREFERENCE,
    COMMUNITIES,
    MP_REACHABLE_NLRI,
    MP_UNREACHABLE_NLRI,
    EXTENDED_COMMUNITIES,
    AS4_PATH,
    /// <https://datatracker.ietf.org/doc/html/draft-ietf-idr-as-pathlimit-03>
    AS_PATHLIMIT,
    /// Catch all for any unknown attribute types
    Unknown(u8),
}

impl From<u8> for AttrType {
    fn from(value: u8) -> Self {
        match value {
            1 => AttrType::ORIGIN,
            2 => AttrType::AS_PATH,
            3 => AttrType::NEXT_HOP,
            4 => AttrType::MULTI_EXIT_DISCRIMINATOR,
            5 => AttrType::LOCAL_PREFERENCE,
            8 => AttrType::COMMUNITIES,
            14 => AttrType::MP_REACHABLE_NLRI,
            15 => AttrType::MP_UNREACHABLE_NLRI,
            16 => AttrType::EXTENDED_COMMUNITIES,
            17 => AttrType::AS4_PATH,
            21 => AttrType::AS_PATHLIMIT,
            x => AttrType::Unknown(x),
        }
    }
}

impl From<AttrType> for u8 {
    fn from(value: AttrType) -> Self {
        match value {
            AttrType::ORIGIN => 1,
            AttrType::AS_PATH => 2,
            AttrType::NEXT_HOP => 3,
            AttrType::MULTI_EXIT_DISCRIMINATOR => 4,
            AttrType::LOCAL_PREFERENCE => 5,
            AttrType::COMMUNITIES => 8,
            AttrType::MP_REACHABLE_NLRI => 14,
            AttrType::MP_UNREACHABLE_NLRI => 15,
            AttrType::EXTENDED_COMMUNITIES => 16,
            AttrType::AS4_PATH => 17,
            AttrType::AS_PATHLIMIT => 21,
            AttrType::Unknown(x) => x,
        }
    }
}

/// Origin attribute.
#[allow(non_camel_case_types)]
#[derive(Debug, Default, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Hash, Copy, Clone)]
#[repr(u8)]
pub enum Origin {
    IGP = 0,
    EGP = 1,
    #[default]
    INCOMPLETE = 2,
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::IGP => write!(f, "IGP"),
            Origin::EGP => write!(f, "EGP"),
            Origin::INCOMPLETE => write!(f, "INCOMPLETE"),
        }
    }
}

/// AS_PATHLIMIT attribute value: an upper bound on how far the route may
/// propagate, tied to the AS that set it.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct PathLimit {
    pub ttl: u8,
    pub asn: u32,
}

/// Path attributes of one UPDATE as decoded off the wire, before interning.
///
/// Sub-values are owned; [crate::interner::AttrStores::intern_attrs]
/// consumes this and hands back a canonical [AttrSet] handle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PathAttributes {
    pub origin: Origin,
    pub next_hop: Option<Ipv4Addr>,
    pub med: Option<u32>,
    pub local_pref: Option<u32>,
    pub path_limit: Option<PathLimit>,
    pub as_path: Option<AsPath>,
    pub communities: Option<CommunityList>,
    pub ext_communities: Option<ExtCommunityList>,
}

/// The canonical, interned form of a path attribute set.
///
/// Immutable and shared: every route carrying byte-identical attributes
/// points at the same entry. Sub-values are themselves interned, so
/// comparing their keys compares content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttrSet {
    pub origin: Origin,
    pub next_hop: Option<Ipv4Addr>,
    pub med: Option<u32>,
    pub local_pref: Option<u32>,
    pub path_limit: Option<PathLimit>,
    pub as_path: Option<InternKey<AsPath>>,
    pub communities: Option<InternKey<CommunityList>>,
    pub ext_communities: Option<InternKey<ExtCommunityList>>,
}
