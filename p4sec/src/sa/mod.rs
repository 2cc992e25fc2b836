//! # Security associations
//!
//! Key material and identifiers of the security associations used by the
//! command line tool, loaded from a YAML file.

#[allow(clippy::module_inception)]
pub(crate) mod sa;

pub(crate) use sa::*;
