/*!
Configuration handed in by the embedding daemon.
*/
use std::net::{IpAddr, Ipv4Addr};

/// Default BGP TCP port.
pub const BGP_TCP_PORT: u16 = 179;
/// Default listen backlog when the daemon does not set one.
pub const DEFAULT_MAX_PEERS: usize = 32;

/// Settings for the BGP listener.
#[derive(Debug, Clone)]
pub struct BgpConfig {
    /// Address to bind; all IPv4 interfaces when unset.
    pub listen_ip: Option<IpAddr>,
    pub listen_port: u16,
    /// Listen backlog. One peer is active at a time; further connections
    /// queue here until the active one goes away.
    pub max_peers: usize,
    /// Our autonomous system number. Values above 65535 require the peer to
    /// advertise the 4-octet AS capability.
    pub local_asn: u32,
    /// BGP identifier written into OPEN replies. There is no usable
    /// default, so it is required up front.
    pub router_id: Ipv4Addr,
    /// Emit one log line per accepted and withdrawn route.
    pub log_updates: bool,
}

impl BgpConfig {
    pub fn new(local_asn: u32, router_id: Ipv4Addr) -> Self {
        BgpConfig {
            listen_ip: None,
            listen_port: BGP_TCP_PORT,
            max_peers: DEFAULT_MAX_PEERS,
            local_asn,
            router_id,
            log_updates: false,
        }
    }
}
