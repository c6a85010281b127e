/*!
Data structures for BGP messages, path attributes, and network types.
*/
pub mod bgp;
pub mod network;

pub use bgp::*;
pub use network::*;
