/*!
The Routing Information Base: one prefix trie per supported (AFI, SAFI).

Routes only enter through the session layer and only leave through
withdrawal or session teardown. Lookups borrow route entries whose
attribute handles stay valid until the owning session tears down.
*/
mod table;

pub use table::{NodeId, RibTable, RouteInfo};

use crate::interner::AttrStores;
use crate::models::{Afi, Safi};
use ipnet::IpNet;
use std::net::IpAddr;

/// Per-(AFI, SAFI) routing tables. IPv4 and IPv6 unicast are the supported
/// pairs; NLRI for anything else is parsed over and dropped.
pub struct Rib {
    v4_unicast: RibTable,
    v6_unicast: RibTable,
}

impl Rib {
    pub fn new() -> Self {
        Rib {
            v4_unicast: RibTable::new(Afi::Ipv4, Safi::Unicast),
            v6_unicast: RibTable::new(Afi::Ipv6, Safi::Unicast),
        }
    }

    pub fn table(&self, afi: Afi, safi: Safi) -> Option<&RibTable> {
        match (afi, safi) {
            (Afi::Ipv4, Safi::Unicast) => Some(&self.v4_unicast),
            (Afi::Ipv6, Safi::Unicast) => Some(&self.v6_unicast),
            _ => None,
        }
    }

    pub fn table_mut(&mut self, afi: Afi, safi: Safi) -> Option<&mut RibTable> {
        match (afi, safi) {
            (Afi::Ipv4, Safi::Unicast) => Some(&mut self.v4_unicast),
            (Afi::Ipv6, Safi::Unicast) => Some(&mut self.v6_unicast),
            _ => None,
        }
    }

    /// Longest-prefix match for `addr` in the given table: the covering
    /// prefix and the routes attached to it.
    pub fn match_route(&self, afi: Afi, safi: Safi, addr: &IpAddr) -> Option<(IpNet, &[RouteInfo])> {
        let table = self.table(afi, safi)?;
        let node = table.node_match(addr)?;
        Some((table.prefix(node), table.routes(node)))
    }

    /// Tear down every table, releasing all interned attribute sets, and
    /// leave clean empty tables behind.
    pub fn clear(&mut self, stores: &mut AttrStores) {
        self.v4_unicast.clear(stores);
        self.v6_unicast.clear(stores);
    }

    pub fn is_empty(&self) -> bool {
        self.v4_unicast.is_empty() && self.v6_unicast.is_empty()
    }
}

impl Default for Rib {
    fn default() -> Self {
        Self::new()
    }
}
