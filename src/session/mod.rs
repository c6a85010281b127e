/*!
The BGP session layer: one listener, one active peer, and the state machine
between them.

The I/O-free core lives in [Session]: it consumes framed messages, walks the
OPEN/KEEPALIVE/UPDATE state machine, and applies route changes to the RIB.
[run] wraps it with a blocking TCP accept/recv loop. Any error tears the
peer down completely -- socket closed, all tables cleared -- and the
listener goes back to `accept`.
*/
use bytes::Bytes;
use chrono::Utc;
use ipnet::IpNet;
use itertools::Itertools;
use log::{debug, info, warn};
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};

use crate::config::BgpConfig;
use crate::error::{ParserError, SessionError};
use crate::interner::{AttrStores, InternKey};
use crate::models::*;
use crate::parser::{
    parse_bgp_open_message, parse_bgp_update_message, BgpFrame, FrameAssembler,
};
use crate::rib::{Rib, RouteInfo};

/// Identifies the connection a route was learned from. Entries in the RIB
/// carry this as a plain lookup key; each accepted connection gets a fresh
/// value so entries can never outlive their session by mistake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub u64);

/// Session state machine (RFC 4271, Section 8, reduced to the passive
/// subset this speaker walks through).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PeerState {
    Idle,
    Active,
    OpenSent,
    Established,
}

/// Everything negotiated with the connected neighbor.
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: PeerId,
    pub state: PeerState,
    /// Remote AS number after 2-byte/4-byte reconciliation.
    pub asn: Asn,
    /// Remote BGP identifier from its OPEN.
    pub identifier: BgpIdentifier,
    /// Effective hold time: max(5, what the peer advertised).
    pub hold_time: u16,
    pub cap_multiprotocol: bool,
    pub cap_four_octet_as: bool,
}

impl Peer {
    fn new(id: PeerId) -> Self {
        Peer {
            id,
            state: PeerState::Idle,
            asn: Asn::RESERVED,
            identifier: Ipv4Addr::UNSPECIFIED,
            hold_time: 0,
            cap_multiprotocol: false,
            cap_four_octet_as: false,
        }
    }
}

/// The I/O-free session core: owns the peer state, the interning tables,
/// and the RIBs. Feed it framed messages; it hands back reply frames.
pub struct Session {
    config: BgpConfig,
    peer: Peer,
    stores: AttrStores,
    rib: Rib,
    next_peer_id: u64,
}

impl Session {
    pub fn new(config: BgpConfig) -> Self {
        Session {
            config,
            peer: Peer::new(PeerId(1)),
            stores: AttrStores::new(),
            rib: Rib::new(),
            next_peer_id: 2,
        }
    }

    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    pub fn rib(&self) -> &Rib {
        &self.rib
    }

    pub fn stores(&self) -> &AttrStores {
        &self.stores
    }

    pub fn config(&self) -> &BgpConfig {
        &self.config
    }

    /// Dispatch one framed message. `Ok` carries the frames to send back;
    /// `Err` means the peer must be closed.
    pub fn handle_frame(&mut self, frame: BgpFrame) -> Result<Vec<Bytes>, SessionError> {
        match frame.msg_type {
            BgpMessageType::OPEN => self.handle_open(frame.payload),
            BgpMessageType::KEEPALIVE => self.handle_keepalive(),
            BgpMessageType::UPDATE => self.handle_update(frame.payload),
            BgpMessageType::NOTIFICATION => {
                debug!("NOTIFICATION: id: {}", self.peer.identifier);
                Err(SessionError::Notification)
            }
        }
    }

    /// The peer connection is gone: drop every learned route, release all
    /// interned attributes, and stand up fresh state for the next accept.
    pub fn peer_closed(&mut self) {
        self.rib.clear(&mut self.stores);
        self.peer = Peer::new(PeerId(self.next_peer_id));
        self.next_peer_id += 1;
    }

    fn handle_open(&mut self, payload: Bytes) -> Result<Vec<Bytes>, SessionError> {
        if self.peer.state >= PeerState::OpenSent {
            // already through a successful OPEN exchange; ignore repeats
            debug!("ignoring OPEN from {}", self.peer.identifier);
            return Ok(vec![]);
        }
        self.peer.state = PeerState::Active;

        let open = parse_bgp_open_message(payload)?;
        if open.version != BGP_VERSION {
            return Err(SessionError::Unsupported(format!(
                "BGP version {}",
                open.version
            )));
        }

        self.peer.hold_time = open.hold_time.max(5);
        self.peer.identifier = open.identifier;

        let remote_as = open.asn;
        let mut remote_as4: Option<u32> = None;
        let mut echoed: Vec<Capability> = vec![];

        // Walk the advertised capabilities. Multiprotocol and 4-octet AS
        // are acted on and echoed; everything else is left out of the reply.
        for cap in &open.capabilities {
            match cap.code {
                BgpCapabilityType::MULTIPROTOCOL_EXTENSIONS_FOR_BGP_4 => {
                    let mp = MultiprotocolExtensionsCapability::parse(&cap.value)?;
                    debug!("capability: multiprotocol afi {} safi {}", mp.afi, mp.safi);
                    self.peer.cap_multiprotocol = true;
                    echoed.push(cap.clone());
                }
                BgpCapabilityType::SUPPORT_FOR_4_OCTET_AS_NUMBER_CAPABILITY => {
                    let as4 = FourOctetAsCapability::parse(&cap.value)?;
                    debug!("capability: 4-octet AS {}", as4.asn);
                    self.peer.cap_four_octet_as = true;
                    remote_as4 = Some(as4.asn);
                    // echoed with our own AS number in place of theirs
                    echoed.push(Capability {
                        code: cap.code,
                        value: self.config.local_asn.to_be_bytes().to_vec(),
                    });
                }
                other => debug!("ignoring capability {:?}", other),
            }
        }

        self.peer.asn = reconcile_remote_asn(remote_as, remote_as4)?;
        info!(
            "OPEN: id: {} asn: {} holdtime: {}",
            self.peer.identifier, self.peer.asn, self.peer.hold_time
        );

        let local_asn = self.config.local_asn;
        let my_as = if local_asn > u16::MAX as u32 {
            if !self.peer.cap_four_octet_as {
                return Err(SessionError::Unsupported(
                    "local ASN is 4-octet but the peer did not advertise the capability"
                        .to_string(),
                ));
            }
            Asn::TRANSITION
        } else {
            Asn::new_16bit(local_asn as u16)
        };

        let reply = BgpOpenMessage {
            version: BGP_VERSION,
            asn: my_as,
            hold_time: self.peer.hold_time,
            identifier: self.config.router_id,
            capabilities: echoed,
        };

        self.peer.state = PeerState::OpenSent;
        Ok(vec![reply.encode(), encode_keepalive_message()])
    }

    fn handle_keepalive(&mut self) -> Result<Vec<Bytes>, SessionError> {
        // before a successful OPEN exchange, KEEPALIVEs are silently dropped
        if self.peer.state < PeerState::OpenSent {
            return Ok(vec![]);
        }

        if self.peer.state < PeerState::Established {
            self.peer.state = PeerState::Established;
            info!(
                "neighbor established: id: {} asn: {}",
                self.peer.identifier, self.peer.asn
            );
        }
        debug!("KEEPALIVE: id: {}", self.peer.identifier);
        Ok(vec![encode_keepalive_message()])
    }

    fn handle_update(&mut self, payload: Bytes) -> Result<Vec<Bytes>, SessionError> {
        if self.peer.state < PeerState::Established {
            return Err(SessionError::Malformed(
                "UPDATE before session establishment".to_string(),
            ));
        }

        let external_peer = self.peer.asn != self.config.local_asn;
        match parse_bgp_update_message(payload, self.peer.cap_four_octet_as, external_peer) {
            Ok(update) => {
                self.apply_update(update);
                Ok(vec![])
            }
            Err(ParserError::AttributeError(e)) => {
                warn!("UPDATE: malformed attribute, discarding message ({e})");
                Ok(vec![])
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply one parsed UPDATE to the tables. Within a message the order is
    /// fixed: IPv4 withdrawals, IPv4 announcements, MP withdrawals, MP
    /// announcements.
    fn apply_update(&mut self, update: BgpUpdateMessage) {
        let BgpUpdateMessage {
            withdrawn_prefixes,
            attributes,
            announced_prefixes,
            mp_reachable,
            mp_unreachable,
        } = update;

        let announces_routes = !announced_prefixes.is_empty()
            || mp_reachable
                .as_ref()
                .is_some_and(|mp| !mp.prefixes.is_empty());
        // one message-scope reference, dropped at the end; routes that keep
        // the set take their own
        let attr_key = announces_routes.then(|| self.stores.intern_attrs(attributes));

        for prefix in &withdrawn_prefixes {
            self.process_withdraw(prefix, Afi::Ipv4, Safi::Unicast);
        }
        if let Some(attr_key) = attr_key {
            for prefix in &announced_prefixes {
                self.process_update(prefix, attr_key, Afi::Ipv4, Safi::Unicast);
            }
        }
        if let Some(mp) = &mp_unreachable {
            for prefix in &mp.prefixes {
                self.process_withdraw(prefix, mp.afi, mp.safi);
            }
        }
        if let (Some(mp), Some(attr_key)) = (&mp_reachable, attr_key) {
            for prefix in &mp.prefixes {
                self.process_update(prefix, attr_key, mp.afi, mp.safi);
            }
        }

        if let Some(attr_key) = attr_key {
            self.stores.unintern_attrs(attr_key);
        }
    }

    /// Locate or create the node for `prefix` and attach, refresh, or
    /// replace this peer's route there.
    fn process_update(&mut self, prefix: &IpNet, attr_key: InternKey<AttrSet>, afi: Afi, safi: Safi) {
        let Session {
            config,
            peer,
            stores,
            rib,
            ..
        } = self;
        let Some(table) = rib.table_mut(afi, safi) else {
            debug!("dropping NLRI for untracked family {:?}/{:?}", afi, safi);
            return;
        };

        let node = table.node_get(*prefix);
        match table.route_position(node, peer.id, afi, safi) {
            Some(pos) => {
                let route = table.route_mut(node, pos);
                route.uptime = Utc::now();
                if route.attr == attr_key {
                    // same information re-advertised
                    table.unlock_node(node);
                    return;
                }
                let old_attr = route.attr;
                route.attr = attr_key;
                stores.retain_attrs(attr_key);
                stores.unintern_attrs(old_attr);
            }
            None => {
                stores.retain_attrs(attr_key);
                table.info_add(
                    node,
                    RouteInfo {
                        peer: peer.id,
                        afi,
                        safi,
                        attr: attr_key,
                        uptime: Utc::now(),
                    },
                );
            }
        }
        table.unlock_node(node);

        if config.log_updates {
            log_route('u', prefix, stores, attr_key);
        }
    }

    /// Remove this peer's route for `prefix`, if one exists.
    fn process_withdraw(&mut self, prefix: &IpNet, afi: Afi, safi: Safi) {
        let Session {
            config,
            peer,
            stores,
            rib,
            ..
        } = self;
        let Some(table) = rib.table_mut(afi, safi) else {
            debug!("dropping NLRI for untracked family {:?}/{:?}", afi, safi);
            return;
        };

        let node = table.node_get(*prefix);
        if let Some(pos) = table.route_position(node, peer.id, afi, safi) {
            if config.log_updates {
                log_route('w', prefix, stores, table.routes(node)[pos].attr);
            }
            table.info_delete(node, pos, stores);
        }
        table.unlock_node(node);
    }
}

/// Settle the remote AS number from the 2-octet OPEN field and the optional
/// 4-octet capability (RFC 6793, Section 4.2.2):
///
/// - AS_TRANS in the OPEN requires a 4-octet capability carrying the real
///   number, which must not be 0 or AS_TRANS itself.
/// - any other OPEN value allows the capability to be absent, zero, or an
///   exact repeat; a different value is a lie.
fn reconcile_remote_asn(remote_as: Asn, remote_as4: Option<u32>) -> Result<Asn, SessionError> {
    if remote_as == Asn::TRANSITION {
        match remote_as4 {
            Some(as4) if as4 != 0 && Asn::TRANSITION != as4 => Ok(Asn::new_32bit(as4)),
            _ => Err(SessionError::Malformed(
                "AS_TRANS without a valid 4-octet AS capability".to_string(),
            )),
        }
    } else {
        match remote_as4 {
            None | Some(0) => Ok(remote_as),
            Some(as4) if remote_as == as4 => Ok(remote_as),
            Some(as4) => Err(SessionError::Malformed(format!(
                "4-octet AS capability {} contradicts OPEN AS {}",
                as4, remote_as
            ))),
        }
    }
}

fn log_route(kind: char, prefix: &IpNet, stores: &AttrStores, attr_key: InternKey<AttrSet>) {
    let attr = stores.attr_set(attr_key);
    let as_path = attr
        .as_path
        .map(|key| stores.as_path(key).to_string())
        .unwrap_or_default();
    let communities = attr
        .communities
        .map(|key| stores.communities(key).iter().join(" "))
        .unwrap_or_default();
    let ext_communities = attr
        .ext_communities
        .map(|key| stores.ext_communities(key).iter().join(" "))
        .unwrap_or_default();
    info!(
        "{} Prefix: '{}' Path: '{}' Comms: '{}' EComms: '{}'",
        kind, prefix, as_path, communities, ext_communities
    );
}

/// Bind the listening socket with a backlog of `max_peers`.
fn bind_listener(config: &BgpConfig) -> Result<TcpListener, SessionError> {
    let ip = config
        .listen_ip
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    let addr = SocketAddr::new(ip, config.listen_port);

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(config.max_peers as i32)?;
    Ok(socket.into())
}

/// The blocking accept/recv loop. Serves one peer at a time; every peer
/// close, parse error, or socket error lands back in `accept` with empty
/// tables. Only a failure to accept ends the worker.
pub fn run(config: BgpConfig) -> Result<(), SessionError> {
    let listener = bind_listener(&config)?;
    info!(
        "listening on {}:{} (maximum BGP peers allowed: {})",
        config
            .listen_ip
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        config.listen_port,
        config.max_peers
    );

    let mut session = Session::new(config);
    let mut assembler = FrameAssembler::new();
    let mut chunk = [0u8; BGP_MAX_MESSAGE_SIZE];

    loop {
        let (mut stream, remote) = listener.accept()?;
        info!("accepted BGP connection from {}", remote);

        'peer: loop {
            let received = match stream.read(&mut chunk) {
                Ok(0) => {
                    info!("BGP connection closed by {}", remote);
                    break 'peer;
                }
                Ok(n) => n,
                Err(e) => {
                    info!("BGP connection to {} was reset ({})", remote, e);
                    break 'peer;
                }
            };

            assembler.push(&chunk[..received]);
            loop {
                match assembler.next_frame() {
                    Ok(Some(frame)) => match session.handle_frame(frame) {
                        Ok(replies) => {
                            for reply in replies {
                                if let Err(e) = stream.write_all(&reply) {
                                    info!("send to {} failed ({})", remote, e);
                                    break 'peer;
                                }
                            }
                        }
                        Err(e) => {
                            info!("closing peer {}: {}", remote, e);
                            break 'peer;
                        }
                    },
                    Ok(None) => break,
                    Err(e) => {
                        info!("closing peer {}: {}", remote, e);
                        break 'peer;
                    }
                }
            }
        }

        drop(stream);
        session.peer_closed();
        assembler.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_remote_asn() {
        // plain 2-octet peer
        assert_eq!(
            reconcile_remote_asn(Asn::new_16bit(65000), None).unwrap(),
            Asn::new_16bit(65000)
        );
        // capability repeating the OPEN value is fine
        assert_eq!(
            reconcile_remote_asn(Asn::new_16bit(65000), Some(65000)).unwrap(),
            Asn::new_16bit(65000)
        );
        // zero capability means "no real 4-octet number"
        assert_eq!(
            reconcile_remote_asn(Asn::new_16bit(65000), Some(0)).unwrap(),
            Asn::new_16bit(65000)
        );
        // AS_TRANS resolves through the capability
        assert_eq!(
            reconcile_remote_asn(Asn::TRANSITION, Some(70000)).unwrap(),
            Asn::new_32bit(70000)
        );

        // AS_TRANS with no, zero, or AS_TRANS capability is invalid
        assert!(reconcile_remote_asn(Asn::TRANSITION, None).is_err());
        assert!(reconcile_remote_asn(Asn::TRANSITION, Some(0)).is_err());
        assert!(reconcile_remote_asn(Asn::TRANSITION, Some(23456)).is_err());
        // contradicting values are invalid
        assert!(reconcile_remote_asn(Asn::new_16bit(65000), Some(65001)).is_err());
    }
}
