//! # Cli
//!
//! Cli module, providing tools for registering and accessing command line interface arguments
//! as well as defining the subcommands that the tool supports.
//!
//! Arguments are parsed twice. One first round, called "thin", only finds the subcommand that
//! was run and the main configuration (which the logger needs before anything else happens). The
//! second round, called "full", validates the arguments of that subcommand.

#[allow(clippy::module_inception)]
pub(crate) mod cli;

// Re-export cli.rs
pub(crate) use cli::*;
