//! # Generate
//!
//! Files generated at runtime from the command line definition.

pub(crate) mod completion;
pub(crate) use completion::*;
