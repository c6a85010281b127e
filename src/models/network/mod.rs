//! Network related structs: address families, AS numbers, next hops.
mod afi;
mod asn;
mod nexthop;

pub use afi::*;
pub use asn::*;
pub use nexthop::*;
