//! UDP networking: JSON wire messages, datagram endpoints, LAN discovery,
//! and the client-side login and snapshot feed.

pub mod client;
pub mod discovery;
pub mod error;
pub mod messages;
pub mod udp;

pub use client::{LoginAccepted, ServerLink};
pub use discovery::{
    Announcer, DEFAULT_DISCOVERY_PORT, DEFAULT_GAME_PORT, DiscoveryListener, bind_reusable,
    broadcast_target, discover,
};
pub use error::NetError;
pub use messages::{
    CodecError, DEFAULT_WIRE_DECIMALS, Entry, Message, StateMessage, decode, encode,
};
pub use udp::{DEFAULT_MAX_DATAGRAM, Datagram, Endpoint, Receiver};
