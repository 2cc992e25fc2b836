//! # Crypto
//!
//! Thin wrappers around the RustCrypto primitives used by the transforms.
//! Cipher contexts only live for the duration of a call.

pub mod ctr;
pub mod gcm;
pub mod icv;
