//! # p4sec
//!
//! Packet transforms run by a software packet-processing pipeline to protect
//! traffic: tunnel-mode IPsec ESP (AES-128-CTR, HMAC-MD5-96) and MACsec
//! (GCM-AES-128).
//!
//! The pipeline owns the packets and their parsed headers. It hands them to
//! the transforms through the [`core::PacketBuffer`] and
//! [`core::HeaderFields`] traits, together with key material coming from its
//! tables.

pub mod core;
pub mod crypto;
pub mod esp;
pub mod keygen;
pub mod macsec;
