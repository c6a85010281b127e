/*!
ribview is a passive BGP-4 speaker for embedding in a network-telemetry
daemon. It accepts a connection from a BGP neighbor, negotiates the session,
and consumes UPDATE messages so the host always has a live view of the
routes the peer advertises.

It is strictly a receiver: no routes are originated or exported, no best
path is selected, and the only messages it ever sends are its OPEN reply
and KEEPALIVEs.

What it keeps for you:
- per-(AFI, SAFI) routing tables (IPv4 and IPv6 unicast) with
  longest-prefix-match lookup,
- path attribute sets deduplicated into content-addressed stores, so routes
  with identical attributes share one entry,
- reconciled 4-octet AS numbers (RFC 6793) and multiprotocol NLRI
  (RFC 4760).

# Example

Run the listener on a dedicated worker thread and query the tables from the
session handle:

```no_run
use ribview::BgpConfig;

let mut config = BgpConfig::new(65001, "192.0.2.1".parse().unwrap());
config.listen_port = 1179;
config.log_updates = true;

// blocks forever, serving one peer at a time
ribview::run(config).unwrap();
```

The session core is I/O-free and can be driven without a socket, which is
how the integration tests exercise the whole exchange:

```
use ribview::parser::FrameAssembler;
use ribview::session::Session;
use ribview::BgpConfig;

let mut session = Session::new(BgpConfig::new(65001, "192.0.2.1".parse().unwrap()));
let mut assembler = FrameAssembler::new();
// assembler.push(&bytes_from_recv);
while let Some(frame) = assembler.next_frame().unwrap() {
    let _replies = session.handle_frame(frame).unwrap();
    // write the replies back to the socket
}
```
*/
pub mod config;
pub mod error;
pub mod interner;
pub mod models;
pub mod parser;
pub mod rib;
pub mod session;

pub use config::BgpConfig;
pub use error::{ParserError, SessionError};
pub use session::{run, Session};
