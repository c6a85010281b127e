use std::net::{IpAddr, Ipv4Addr};

use clap::Parser;
use ribview::config::{BGP_TCP_PORT, DEFAULT_MAX_PEERS};
use ribview::BgpConfig;

/// Passive BGP-4 speaker: accepts a neighbor session and keeps a live view
/// of the routes it advertises.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Opts {
    /// Local autonomous system number
    #[clap(short, long)]
    asn: u32,

    /// BGP identifier sent in OPEN replies
    #[clap(short, long)]
    router_id: Ipv4Addr,

    /// Address to listen on; all IPv4 interfaces when omitted
    #[clap(short, long)]
    listen_ip: Option<IpAddr>,

    /// TCP port to listen on
    #[clap(short, long, default_value_t = BGP_TCP_PORT)]
    port: u16,

    /// Listen backlog for peers waiting behind the active one
    #[clap(long, default_value_t = DEFAULT_MAX_PEERS)]
    max_peers: usize,

    /// Log every accepted and withdrawn route
    #[clap(long)]
    log_updates: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();
    let mut config = BgpConfig::new(opts.asn, opts.router_id);
    config.listen_ip = opts.listen_ip;
    config.listen_port = opts.port;
    config.max_peers = opts.max_peers;
    config.log_updates = opts.log_updates;

    if let Err(e) = ribview::run(config) {
        log::error!("BGP worker terminated: {e}");
        std::process::exit(1);
    }
}
