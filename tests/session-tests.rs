//! End-to-end session tests: raw wire bytes in, reply frames and RIB state
//! out. No sockets involved; the byte stream is fed straight into the
//! reassembly buffer.
use bytes::Bytes;
use ipnet::IpNet;
use ribview::models::{
    Afi, AsPath, Asn, BgpCapabilityType, Safi, BGP_HEADER_SIZE,
};
use ribview::parser::{encode_nlri_prefix, parse_bgp_open_message, FrameAssembler};
use ribview::session::{PeerState, Session};
use ribview::{BgpConfig, SessionError};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

const LOCAL_ASN: u32 = 65001;

fn new_session() -> Session {
    Session::new(BgpConfig::new(LOCAL_ASN, Ipv4Addr::new(1, 2, 3, 4)))
}

fn message(msg_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0xff_u8; 16];
    bytes.extend_from_slice(&((BGP_HEADER_SIZE + payload.len()) as u16).to_be_bytes());
    bytes.push(msg_type);
    bytes.extend_from_slice(payload);
    bytes
}

fn open_message(asn: u16, hold_time: u16, id: [u8; 4], caps: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut params = vec![];
    for (code, value) in caps {
        params.push(2u8); // parameter type: capability
        params.push(value.len() as u8 + 2);
        params.push(*code);
        params.push(value.len() as u8);
        params.extend_from_slice(value);
    }

    let mut payload = vec![4u8]; // version
    payload.extend_from_slice(&asn.to_be_bytes());
    payload.extend_from_slice(&hold_time.to_be_bytes());
    payload.extend_from_slice(&id);
    payload.push(params.len() as u8);
    payload.extend_from_slice(&params);
    message(1, &payload)
}

fn update_message(withdrawn: &[u8], attrs: &[u8], nlri: &[u8]) -> Vec<u8> {
    let mut payload = vec![];
    payload.extend_from_slice(&(withdrawn.len() as u16).to_be_bytes());
    payload.extend_from_slice(withdrawn);
    payload.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
    payload.extend_from_slice(attrs);
    payload.extend_from_slice(nlri);
    message(2, &payload)
}

fn keepalive_message() -> Vec<u8> {
    message(4, &[])
}

/// Push bytes through reassembly and the session, collecting replies.
fn feed(
    session: &mut Session,
    assembler: &mut FrameAssembler,
    bytes: &[u8],
) -> Result<Vec<Bytes>, SessionError> {
    assembler.push(bytes);
    let mut replies = vec![];
    loop {
        match assembler.next_frame()? {
            Some(frame) => replies.extend(session.handle_frame(frame)?),
            None => return Ok(replies),
        }
    }
}

/// Drive the session to Established with a plain 2-octet OPEN.
fn establish(session: &mut Session, assembler: &mut FrameAssembler) {
    let caps = vec![
        (1u8, vec![0x00, 0x01, 0x00, 0x01]), // multiprotocol IPv4/unicast
        (1u8, vec![0x00, 0x02, 0x00, 0x01]), // multiprotocol IPv6/unicast
    ];
    feed(
        session,
        assembler,
        &open_message(65000, 90, [10, 0, 0, 1], &caps),
    )
    .unwrap();
    feed(session, assembler, &keepalive_message()).unwrap();
    assert_eq!(session.peer().state, PeerState::Established);
}

// attribute bytes shared by several tests:
// ORIGIN=IGP, AS_PATH=65001, NEXT_HOP=192.0.2.1, MED=100
const BASE_ATTRS: &[u8] = &[
    0x40, 0x01, 0x01, 0x00, // ORIGIN: IGP
    0x40, 0x02, 0x04, 0x02, 0x01, 0xfd, 0xe9, // AS_PATH: 65001
    0x40, 0x03, 0x04, 0xc0, 0x00, 0x02, 0x01, // NEXT_HOP: 192.0.2.1
    0x80, 0x04, 0x04, 0x00, 0x00, 0x00, 0x64, // MED: 100
];

#[test]
fn test_basic_open_handshake() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();

    let replies = feed(
        &mut session,
        &mut assembler,
        &open_message(65000, 90, [10, 0, 0, 1], &[]),
    )
    .unwrap();

    // OPEN reply followed by one KEEPALIVE
    assert_eq!(replies.len(), 2);
    let reply_open =
        parse_bgp_open_message(replies[0].slice(BGP_HEADER_SIZE..)).unwrap();
    assert_eq!(reply_open.version, 4);
    assert_eq!(reply_open.asn, Asn::new_16bit(65001));
    assert_eq!(reply_open.hold_time, 90);
    assert_eq!(reply_open.identifier, Ipv4Addr::new(1, 2, 3, 4));
    assert!(reply_open.capabilities.is_empty());
    assert_eq!(&replies[1][..], &keepalive_message()[..]);

    assert_eq!(session.peer().state, PeerState::OpenSent);
    assert_eq!(session.peer().asn, Asn::new_16bit(65000));
    assert_eq!(session.peer().identifier, Ipv4Addr::new(10, 0, 0, 1));
    assert_eq!(session.peer().hold_time, 90);
}

#[test]
fn test_hold_time_floor() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();
    feed(
        &mut session,
        &mut assembler,
        &open_message(65000, 3, [10, 0, 0, 1], &[]),
    )
    .unwrap();
    assert_eq!(session.peer().hold_time, 5);
}

#[test]
fn test_four_octet_as_negotiation() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();

    let caps = vec![(65u8, 70000u32.to_be_bytes().to_vec())];
    let replies = feed(
        &mut session,
        &mut assembler,
        &open_message(23456, 90, [10, 0, 0, 1], &caps),
    )
    .unwrap();

    assert_eq!(session.peer().state, PeerState::OpenSent);
    assert_eq!(session.peer().asn, Asn::new_32bit(70000));
    assert!(session.peer().cap_four_octet_as);

    // the echoed capability carries our 32-bit ASN
    let reply_open =
        parse_bgp_open_message(replies[0].slice(BGP_HEADER_SIZE..)).unwrap();
    assert_eq!(reply_open.capabilities.len(), 1);
    assert_eq!(
        reply_open.capabilities[0].code,
        BgpCapabilityType::SUPPORT_FOR_4_OCTET_AS_NUMBER_CAPABILITY
    );
    assert_eq!(
        reply_open.capabilities[0].value,
        LOCAL_ASN.to_be_bytes().to_vec()
    );
}

#[test]
fn test_four_octet_as_zero_rejected() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();

    let caps = vec![(65u8, 0u32.to_be_bytes().to_vec())];
    let result = feed(
        &mut session,
        &mut assembler,
        &open_message(23456, 90, [10, 0, 0, 1], &caps),
    );
    assert!(matches!(result, Err(SessionError::Malformed(_))));
}

#[test]
fn test_as4_capability_mismatch_rejected() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();

    // OPEN AS 65000 but capability claiming 70000
    let caps = vec![(65u8, 70000u32.to_be_bytes().to_vec())];
    let result = feed(
        &mut session,
        &mut assembler,
        &open_message(65000, 90, [10, 0, 0, 1], &caps),
    );
    assert!(matches!(result, Err(SessionError::Malformed(_))));
}

#[test]
fn test_bad_version_rejected() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();

    let mut open = open_message(65000, 90, [10, 0, 0, 1], &[]);
    open[BGP_HEADER_SIZE] = 3; // version
    let result = feed(&mut session, &mut assembler, &open);
    assert!(matches!(result, Err(SessionError::Unsupported(_))));
}

#[test]
fn test_update_before_establishment_rejected() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();

    let result = feed(
        &mut session,
        &mut assembler,
        &update_message(&[], BASE_ATTRS, &[0x08, 0x0a]),
    );
    assert!(matches!(result, Err(SessionError::Malformed(_))));
}

#[test]
fn test_ipv4_advertise_then_withdraw() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();
    establish(&mut session, &mut assembler);

    // UPDATE announcing 10.0.0.0/8
    feed(
        &mut session,
        &mut assembler,
        &update_message(&[], BASE_ATTRS, &[0x08, 0x0a]),
    )
    .unwrap();

    let addr = IpAddr::from_str("10.0.0.1").unwrap();
    let (prefix, routes) = session
        .rib()
        .match_route(Afi::Ipv4, Safi::Unicast, &addr)
        .expect("route present after announcement");
    assert_eq!(prefix, IpNet::from_str("10.0.0.0/8").unwrap());
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].peer, session.peer().id);

    let attr = session.stores().attr_set(routes[0].attr);
    assert_eq!(attr.med, Some(100));
    assert_eq!(attr.next_hop, Some(Ipv4Addr::new(192, 0, 2, 1)));
    let as_path = session.stores().as_path(attr.as_path.unwrap());
    assert_eq!(as_path.to_string(), "65001");
    assert_eq!(session.stores().attr_sets().refcount(routes[0].attr), 1);

    // UPDATE withdrawing the same prefix
    feed(
        &mut session,
        &mut assembler,
        &update_message(&[0x08, 0x0a], &[], &[]),
    )
    .unwrap();

    assert!(session
        .rib()
        .match_route(Afi::Ipv4, Safi::Unicast, &addr)
        .is_none());
    // the attribute set lost its last holder and left the tables
    assert!(session.stores().is_empty());
    assert!(session.rib().is_empty());
    assert!(session
        .rib()
        .table(Afi::Ipv4, Safi::Unicast)
        .unwrap()
        .refcounts_balanced());
}

#[test]
fn test_readvertisement_with_equal_attrs_is_noop() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();
    establish(&mut session, &mut assembler);

    let update = update_message(&[], BASE_ATTRS, &[0x08, 0x0a]);
    feed(&mut session, &mut assembler, &update).unwrap();

    let addr = IpAddr::from_str("10.0.0.1").unwrap();
    let first_key = session
        .rib()
        .match_route(Afi::Ipv4, Safi::Unicast, &addr)
        .unwrap()
        .1[0]
        .attr;
    let first_uptime = session
        .rib()
        .match_route(Afi::Ipv4, Safi::Unicast, &addr)
        .unwrap()
        .1[0]
        .uptime;

    feed(&mut session, &mut assembler, &update).unwrap();

    let (_, routes) = session
        .rib()
        .match_route(Afi::Ipv4, Safi::Unicast, &addr)
        .unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].attr, first_key);
    assert!(routes[0].uptime >= first_uptime);
    // refcounts and table shape unchanged
    assert_eq!(session.stores().attr_sets().refcount(first_key), 1);
    assert_eq!(session.stores().attr_sets().len(), 1);
    assert_eq!(
        session
            .rib()
            .table(Afi::Ipv4, Safi::Unicast)
            .unwrap()
            .node_count(),
        1
    );
}

#[test]
fn test_attribute_replacement_releases_old_set() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();
    establish(&mut session, &mut assembler);

    feed(
        &mut session,
        &mut assembler,
        &update_message(&[], BASE_ATTRS, &[0x08, 0x0a]),
    )
    .unwrap();

    // same prefix, MED changed
    let mut new_attrs = BASE_ATTRS.to_vec();
    *new_attrs.last_mut().unwrap() = 0xc8; // MED: 200
    feed(
        &mut session,
        &mut assembler,
        &update_message(&[], &new_attrs, &[0x08, 0x0a]),
    )
    .unwrap();

    let addr = IpAddr::from_str("10.0.0.1").unwrap();
    let (_, routes) = session
        .rib()
        .match_route(Afi::Ipv4, Safi::Unicast, &addr)
        .unwrap();
    let attr = session.stores().attr_set(routes[0].attr);
    assert_eq!(attr.med, Some(200));
    // the old set died with its last reference; the AS path is shared
    assert_eq!(session.stores().attr_sets().len(), 1);
    assert_eq!(session.stores().as_paths().len(), 1);
}

#[test]
fn test_attribute_sharing_across_prefixes() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();
    establish(&mut session, &mut assembler);

    let first_nlri = encode_nlri_prefix(&IpNet::from_str("10.0.0.0/8").unwrap());
    let second_nlri = encode_nlri_prefix(&IpNet::from_str("10.1.0.0/16").unwrap());
    feed(
        &mut session,
        &mut assembler,
        &update_message(&[], BASE_ATTRS, &first_nlri),
    )
    .unwrap();
    feed(
        &mut session,
        &mut assembler,
        &update_message(&[], BASE_ATTRS, &second_nlri),
    )
    .unwrap();

    let first = session
        .rib()
        .match_route(
            Afi::Ipv4,
            Safi::Unicast,
            &IpAddr::from_str("10.0.0.1").unwrap(),
        )
        .unwrap()
        .1[0]
        .attr;
    let second = session
        .rib()
        .match_route(
            Afi::Ipv4,
            Safi::Unicast,
            &IpAddr::from_str("10.1.0.1").unwrap(),
        )
        .unwrap()
        .1[0]
        .attr;

    // byte-identical attributes resolve to the same interned set
    assert_eq!(first, second);
    assert_eq!(session.stores().attr_sets().refcount(first), 2);
    assert_eq!(session.stores().attr_sets().len(), 1);
}

#[test]
fn test_mp_ipv6_unicast() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();
    establish(&mut session, &mut assembler);

    // MP_REACH_NLRI: IPv6 unicast, next hop 2001:db8::1, NLRI 2001:db8::/32
    let mut mp_value = vec![0x00, 0x02, 0x01, 0x10];
    mp_value.extend_from_slice(&Ipv6Addr::from_str("2001:db8::1").unwrap().octets());
    mp_value.extend_from_slice(&[0x00, 0x20, 0x20, 0x01, 0x0d, 0xb8]);

    let mut attrs = vec![
        0x40, 0x01, 0x01, 0x00, // ORIGIN: IGP
        0x40, 0x02, 0x04, 0x02, 0x01, 0xfd, 0xe9, // AS_PATH: 65001
    ];
    attrs.extend_from_slice(&[0x80, 0x0e, mp_value.len() as u8]);
    attrs.extend_from_slice(&mp_value);

    feed(
        &mut session,
        &mut assembler,
        &update_message(&[], &attrs, &[]),
    )
    .unwrap();

    let addr = IpAddr::from_str("2001:db8::1").unwrap();
    let (prefix, routes) = session
        .rib()
        .match_route(Afi::Ipv6, Safi::Unicast, &addr)
        .expect("IPv6 route present");
    assert_eq!(prefix, IpNet::from_str("2001:db8::/32").unwrap());
    assert_eq!(routes[0].peer, session.peer().id);
    assert_eq!(routes[0].afi, Afi::Ipv6);

    // withdraw it again through MP_UNREACH_NLRI
    let attrs = vec![
        0x80, 0x0f, 0x08, // MP_UNREACH_NLRI, length 8
        0x00, 0x02, 0x01, // IPv6 unicast
        0x20, 0x20, 0x01, 0x0d, 0xb8, // 2001:db8::/32
    ];
    feed(
        &mut session,
        &mut assembler,
        &update_message(&[], &attrs, &[]),
    )
    .unwrap();
    assert!(session
        .rib()
        .match_route(Afi::Ipv6, Safi::Unicast, &addr)
        .is_none());
    assert!(session.stores().is_empty());
}

#[test]
fn test_withdraw_applied_before_announce_within_update() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();
    establish(&mut session, &mut assembler);

    feed(
        &mut session,
        &mut assembler,
        &update_message(&[], BASE_ATTRS, &[0x08, 0x0a]),
    )
    .unwrap();

    // one UPDATE that both withdraws and re-announces 10.0.0.0/8
    feed(
        &mut session,
        &mut assembler,
        &update_message(&[0x08, 0x0a], BASE_ATTRS, &[0x08, 0x0a]),
    )
    .unwrap();

    let addr = IpAddr::from_str("10.0.0.1").unwrap();
    let (_, routes) = session
        .rib()
        .match_route(Afi::Ipv4, Safi::Unicast, &addr)
        .expect("prefix still reachable after withdraw+announce");
    assert_eq!(routes.len(), 1);
    assert_eq!(session.stores().attr_sets().len(), 1);
}

#[test]
fn test_fragmented_keepalive() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();
    feed(
        &mut session,
        &mut assembler,
        &open_message(65000, 90, [10, 0, 0, 1], &[]),
    )
    .unwrap();

    // one KEEPALIVE split across three reads: 5 + 8 + 6 bytes
    let keepalive = keepalive_message();
    let mut replies = vec![];
    replies.extend(feed(&mut session, &mut assembler, &keepalive[..5]).unwrap());
    replies.extend(feed(&mut session, &mut assembler, &keepalive[5..13]).unwrap());
    replies.extend(feed(&mut session, &mut assembler, &keepalive[13..]).unwrap());

    assert_eq!(replies.len(), 1);
    assert_eq!(&replies[0][..], &keepalive[..]);
    assert_eq!(assembler.residual(), 0);
    assert_eq!(session.peer().state, PeerState::Established);
}

#[test]
fn test_notification_tears_down() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();
    establish(&mut session, &mut assembler);

    feed(
        &mut session,
        &mut assembler,
        &update_message(&[], BASE_ATTRS, &[0x08, 0x0a]),
    )
    .unwrap();
    assert!(!session.rib().is_empty());

    // NOTIFICATION: cease
    let result = feed(&mut session, &mut assembler, &message(3, &[0x06, 0x00]));
    assert!(matches!(result, Err(SessionError::Notification)));

    // the accept loop closes the peer; everything is released
    let old_peer = session.peer().id;
    session.peer_closed();
    assert!(session.rib().is_empty());
    assert!(session.stores().is_empty());
    assert_eq!(session.peer().state, PeerState::Idle);
    assert_ne!(session.peer().id, old_peer);
}

#[test]
fn test_malformed_update_attribute_keeps_session() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();
    establish(&mut session, &mut assembler);

    // COMMUNITIES with a length that is not a multiple of 4
    let attrs = vec![0xc0, 0x08, 0x03, 0xfd, 0xe8, 0x00];
    let replies = feed(
        &mut session,
        &mut assembler,
        &update_message(&[], &attrs, &[0x08, 0x0a]),
    )
    .unwrap();
    assert!(replies.is_empty());
    assert_eq!(session.peer().state, PeerState::Established);
    // the offending UPDATE left no routes behind
    assert!(session.rib().is_empty());

    // a following clean UPDATE still lands
    feed(
        &mut session,
        &mut assembler,
        &update_message(&[], BASE_ATTRS, &[0x08, 0x0a]),
    )
    .unwrap();
    assert!(!session.rib().is_empty());
}

#[test]
fn test_update_length_overrun_closes_session() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();
    establish(&mut session, &mut assembler);

    // withdrawn-routes length larger than the message
    let payload = vec![0x00, 0x40, 0x08, 0x0a];
    let result = feed(&mut session, &mut assembler, &message(2, &payload));
    assert!(matches!(result, Err(SessionError::Malformed(_))));
}

#[test]
fn test_local_four_octet_asn_requires_peer_capability() {
    let mut session = Session::new(BgpConfig::new(70000, Ipv4Addr::new(1, 2, 3, 4)));
    let mut assembler = FrameAssembler::new();

    let result = feed(
        &mut session,
        &mut assembler,
        &open_message(65000, 90, [10, 0, 0, 1], &[]),
    );
    assert!(matches!(result, Err(SessionError::Unsupported(_))));

    // with the capability present the reply uses AS_TRANS plus the echo
    let mut session = Session::new(BgpConfig::new(70000, Ipv4Addr::new(1, 2, 3, 4)));
    let mut assembler = FrameAssembler::new();
    let caps = vec![(65u8, 65000u32.to_be_bytes().to_vec())];
    let replies = feed(
        &mut session,
        &mut assembler,
        &open_message(65000, 90, [10, 0, 0, 1], &caps),
    )
    .unwrap();
    let reply_open =
        parse_bgp_open_message(replies[0].slice(BGP_HEADER_SIZE..)).unwrap();
    assert_eq!(reply_open.asn, Asn::TRANSITION);
    assert_eq!(
        reply_open.capabilities[0].value,
        70000u32.to_be_bytes().to_vec()
    );
}

#[test]
fn test_four_byte_as_path_decoding() {
    let mut session = new_session();
    let mut assembler = FrameAssembler::new();

    // establish with the 4-octet AS capability
    let caps = vec![(65u8, 70000u32.to_be_bytes().to_vec())];
    feed(
        &mut session,
        &mut assembler,
        &open_message(23456, 90, [10, 0, 0, 1], &caps),
    )
    .unwrap();
    feed(&mut session, &mut assembler, &keepalive_message()).unwrap();

    // AS_PATH with 32-bit numbers: 70000 65001
    let attrs = vec![
        0x40, 0x01, 0x01, 0x00, // ORIGIN: IGP
        0x40, 0x02, 0x0a, 0x02, 0x02, //
        0x00, 0x01, 0x11, 0x70, // 70000
        0x00, 0x00, 0xfd, 0xe9, // 65001
        0x40, 0x03, 0x04, 0xc0, 0x00, 0x02, 0x01, // NEXT_HOP
    ];
    feed(
        &mut session,
        &mut assembler,
        &update_message(&[], &attrs, &[0x08, 0x0a]),
    )
    .unwrap();

    let (_, routes) = session
        .rib()
        .match_route(
            Afi::Ipv4,
            Safi::Unicast,
            &IpAddr::from_str("10.0.0.1").unwrap(),
        )
        .unwrap();
    let attr = session.stores().attr_set(routes[0].attr);
    let as_path = session.stores().as_path(attr.as_path.unwrap());
    assert_eq!(as_path, &AsPath::from_sequence([70000, 65001]));
}
