//! # Commands
//!
//! Subcommands running the transforms and managing key material.

pub(crate) mod esp;
pub(crate) mod keygen;
pub(crate) mod macsec;
pub(crate) mod packet;

pub(crate) use esp::EspCmd;
pub(crate) use keygen::KeygenCmd;
pub(crate) use macsec::MacsecCmd;
