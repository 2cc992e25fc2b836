#![allow(unexpected_cfgs)]

// Re-export pnet_packet.
pub use pnet_packet::*;

pub mod ethernet;
pub mod ip;
pub mod ipsec;
pub mod macsec;
