//! # Completion
//!
//! Generate a completions file for a specified shell at runtime.

use std::{any::Any, fs, io::Write, path::PathBuf};

use anyhow::{anyhow, Result};
use clap::{
    error::Error as ClapError,
    {value_parser, ArgMatches, Command, FromArgMatches, Parser},
};
use clap_complete::{generate, Generator, Shell};
use log::info;

use crate::cli::*;

/// Generate completion file for a specified shell
#[derive(Parser, Debug, Default)]
#[command(name = "sh-complete")]
pub(crate) struct Complete {
    /// Specify shell to complete for
    // We use an Option and require the parameter to be set here to allow
    // deriving Default on Complete.
    #[arg(long, required = true, value_parser(value_parser!(Shell)))]
    shell: Option<Shell>,

    /// Path to write completion-registration to
    #[arg(long)]
    register: Option<PathBuf>,
}

impl SubCommand for Complete {
    fn new() -> Result<Self>
    where
        Self: Sized,
    {
        Ok(Self::default())
    }

    fn name(&self) -> String {
        <Self as clap::CommandFactory>::command()
            .get_name()
            .to_string()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn full(&mut self) -> Result<Command> {
        Ok(<Self as clap::CommandFactory>::command())
    }

    fn update_from_arg_matches(&mut self, args: &ArgMatches) -> Result<(), ClapError> {
        <Self as FromArgMatches>::update_from_arg_matches(self, args)
    }

    fn runner(&self) -> Result<Box<dyn SubCommandRunner>> {
        Ok(Box::new(CompleteRunner {}))
    }
}

/// Completion needs the whole command definition, not only its own
/// arguments: it runs on the FullCli.
#[derive(Debug)]
pub(crate) struct CompleteRunner {}

impl SubCommandRunner for CompleteRunner {
    fn run(&mut self, cli: FullCli) -> Result<()> {
        let mut cmd = cli.get_command();
        let name = cmd.get_name().to_string();
        let config = cli.run()?;
        let complete = config
            .subcommand
            .as_any()
            .downcast_ref::<Complete>()
            .ok_or_else(|| anyhow!("wrong subcommand"))?;
        let shell = complete
            .shell
            .ok_or_else(|| anyhow!("no shell given"))?;

        let mut buf = Vec::new();
        generate(shell, &mut cmd, name.clone(), &mut buf);

        match &complete.register {
            Some(path) => {
                let path = match path.is_dir() {
                    true => path.join(shell.file_name(&name)),
                    false => path.clone(),
                };
                fs::write(&path, buf)?;
                info!("Completion file written to {}", path.display());
            }
            None => std::io::stdout().write_all(&buf)?,
        }
        Ok(())
    }
}
