/*!
Wire-format parsing: message framing and reassembly, OPEN and UPDATE
decoding, path attributes, and NLRI.

Parsing is zero-copy where the framing allows it: the reassembly buffer is
split into [bytes::Bytes] views that attribute and NLRI readers consume
directly.
*/
pub mod bgp;
pub mod utils;

pub use bgp::*;
pub use utils::*;
