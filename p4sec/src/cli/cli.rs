//! # Cli
//!
//! Subcommand registration and the two parsing rounds.
use std::{any::Any, env, ffi::OsString, fmt::Debug};

use anyhow::{anyhow, bail, Result};
use clap::{
    builder::PossibleValuesParser,
    error::Error as ClapError,
    {ArgMatches, Args, Command, FromArgMatches},
};
use log::{debug, LevelFilter};

use crate::{
    commands::{EspCmd, KeygenCmd, MacsecCmd},
    generate::Complete,
};

/// SubCommandRunner defines the common interface to run SubCommands.
pub(crate) trait SubCommandRunner {
    /// Run the subcommand with the cli configuration.
    fn run(&mut self, cli: FullCli) -> Result<()>;
}

/// SubCommandRunnerFunc is a wrapper for functions that implements SubCommandRunner
pub(crate) struct SubCommandRunnerFunc<F>
where
    F: Fn(FullCli) -> Result<()>,
{
    func: F,
}

impl<F> SubCommandRunnerFunc<F>
where
    F: Fn(FullCli) -> Result<()>,
{
    pub(crate) fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> SubCommandRunner for SubCommandRunnerFunc<F>
where
    F: Fn(FullCli) -> Result<()>,
{
    fn run(&mut self, cli: FullCli) -> Result<()> {
        (self.func)(cli)
    }
}

/// SubCommand defines the way to handle SubCommands.
pub(crate) trait SubCommand {
    /// Allocate and return a new instance of a SubCommand.
    fn new() -> Result<Self>
    where
        Self: Sized;

    /// Returns the unique name of the subcommand.
    fn name(&self) -> String;

    /// Returns self as a std::any::Any trait.
    fn as_any(&self) -> &dyn Any;

    /// Returns self as a mutable std::any::Any trait.
    ///
    /// This is useful for dynamically downcast the SubCommand into it's specific type to access
    /// subcommand-specific functionality.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Generate the clap Command to be used for "full" parsing.
    fn full(&mut self) -> Result<Command>;

    /// Updates internal structures with clap's ArgMatches.
    fn update_from_arg_matches(&mut self, matches: &ArgMatches) -> Result<(), ClapError>;

    /// Return a SubCommandRunner capable of running this command.
    fn runner(&self) -> Result<Box<dyn SubCommandRunner>>;
}

impl Debug for dyn SubCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SubCommand ({})", self.name())
    }
}

/// Trait to convert a clap::Parser into a SubCommandRunner.
pub(crate) trait SubCommandParserRunner: clap::Parser + Default {
    fn run(&mut self, main_config: &MainConfig) -> Result<()>;
}

// Default implementation of SubCommand for all SubCommandParserRunner.
impl<F> SubCommand for F
where
    F: SubCommandParserRunner + 'static,
{
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
        <Self as clap::FromArgMatches>::update_from_arg_matches(self, args)
    }

    fn runner(&self) -> Result<Box<dyn SubCommandRunner>> {
        Ok(Box::new(SubCommandRunnerFunc::new(
            |cli: FullCli| -> Result<()> {
                let mut cli = cli.run()?;
                let cmd: &mut Self = cli
                    .subcommand
                    .as_any_mut()
                    .downcast_mut::<Self>()
                    .ok_or_else(|| anyhow!("wrong subcommand"))?;
                cmd.run(&cli.main_config)
            },
        )))
    }
}

/// Protect and validate packets with IPsec ESP and MACsec
///
/// p4sec runs the packet transforms of the pipeline on packets read from files, and manages the
/// key material of the security associations.
#[derive(Args, Debug, Default)]
pub(crate) struct MainConfig {
    #[arg(
        long,
        value_parser=PossibleValuesParser::new(["error", "warn", "info", "debug", "trace"]),
        default_value = "info",
        help = "Log level",
    )]
    pub(crate) log_level: String,
}

impl MainConfig {
    pub(crate) fn log_level(&self) -> Result<LevelFilter> {
        Ok(match self.log_level.as_str() {
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            x => bail!("Invalid log_level: {}", x),
        })
    }
}

/// ThinCli handles the first (a.k.a "thin") round of Command Line Interface parsing.
#[derive(Debug)]
pub(crate) struct ThinCli {
    subcommands: Vec<Box<dyn SubCommand>>,
}

impl ThinCli {
    /// Allocate and return a new ThinCli object that will parse the command arguments.
    pub(crate) fn new() -> Result<Self> {
        Ok(ThinCli {
            subcommands: Vec::new(),
        })
    }

    /// Add a subcommand to the ThinCli object.
    pub(crate) fn add_subcommand(&mut self, sub: Box<dyn SubCommand>) -> Result<&mut Self> {
        let name = sub.name();

        if self.subcommands.iter().any(|s| s.name() == name) {
            bail!("Subcommand already registered")
        }

        self.subcommands.push(sub);
        Ok(self)
    }

    /// Build a FullCli by running a first round of CLI parsing without subcommand argument
    /// validation.
    /// If clap reports an error (including "--help" and "--version"), print the message and
    /// exit the program.
    pub(crate) fn build(self) -> FullCli {
        self.build_from(env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Build a FullCli by running a first round of CLI parsing with the given list of arguments.
    /// This function should be only used directly by unit tests.
    pub(crate) fn build_from<I, T>(mut self, args: I) -> Result<FullCli, ClapError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(|x| x.into()).collect();
        let mut command = MainConfig::augment_args(Command::new("p4sec"))
            .version(env!("CARGO_PKG_VERSION"))
            .disable_help_subcommand(true)
            .infer_subcommands(true)
            .subcommand_required(true);
        // Add full subcommands so that the main help shows them.
        for sub in self.subcommands.iter_mut() {
            match sub.full() {
                Ok(full) => command = command.subcommand(full),
                Err(e) => {
                    return Err(command.error(clap::error::ErrorKind::InvalidSubcommand, e))
                }
            }
        }

        // Determine the subcommand that was run while ignoring errors from the subcommand
        // arguments.
        let matches = command
            .clone()
            .ignore_errors(true)
            .try_get_matches_from(args.iter())?;

        let ran_subcommand = match matches
            .subcommand_name()
            .and_then(|name| self.subcommands.drain(..).find(|s| s.name() == name))
        {
            Some(sub) => sub,
            // There is no subcommand or it's invalid. Re-run the match to generate the right
            // clap error that to be printed nicely.
            None => {
                return Err(match command.try_get_matches_from_mut(args.iter()) {
                    Err(e) => e,
                    Ok(_) => command.error(
                        clap::error::ErrorKind::MissingSubcommand,
                        "no subcommand given",
                    ),
                })
            }
        };

        // Get main config.
        let mut main_config = MainConfig::default();
        main_config.update_from_arg_matches(&matches)?;

        Ok(FullCli {
            args,
            main_config,
            command,
            subcommand: ran_subcommand,
        })
    }
}

/// FullCli handles the second (a.k.a "full") round of Command Line Interface parsing.
#[derive(Debug)]
pub(crate) struct FullCli {
    pub(crate) main_config: MainConfig,
    args: Vec<OsString>,
    command: Command,
    subcommand: Box<dyn SubCommand>,
}

impl FullCli {
    /// Perform full CLI parsing and validation
    pub(crate) fn run(mut self) -> Result<CliConfig, ClapError> {
        debug!(
            "Resulting CLI arguments: {}",
            self.args
                .iter()
                .map(|o| o.as_os_str().to_str().unwrap_or("<encoding error>"))
                .collect::<Vec<&str>>()
                .join(" ")
        );

        // Get the matches.
        let matches = match cfg!(test) {
            true => self.command.try_get_matches_from_mut(self.args.iter())?,
            false => self
                .command
                .try_get_matches_from_mut(self.args.iter())
                .unwrap_or_else(|e| e.exit()),
        };

        let matches = match matches.subcommand() {
            Some((name, matches)) if name == self.subcommand.name() => matches,
            // Thin and full parsing must yield the same subcommand.
            _ => {
                return Err(self.command.error(
                    clap::error::ErrorKind::InvalidSubcommand,
                    "thin and full parsing did not yield the same subcommand",
                ))
            }
        };

        // Update subcommand options.
        match cfg!(test) {
            true => self.subcommand.update_from_arg_matches(matches)?,
            false => self
                .subcommand
                .update_from_arg_matches(matches)
                .unwrap_or_else(|e| e.exit()),
        }
        Ok(CliConfig {
            main_config: self.main_config,
            subcommand: self.subcommand,
        })
    }

    pub(crate) fn get_subcommand(&self) -> &dyn SubCommand {
        self.subcommand.as_ref()
    }

    pub(crate) fn get_command(&self) -> Command {
        self.command.clone()
    }
}

/// CliConfig represents the result of the Full CLI parsing
#[derive(Debug)]
pub(crate) struct CliConfig {
    pub(crate) main_config: MainConfig,
    pub(crate) subcommand: Box<dyn SubCommand>,
}

/// Create and register a ThinCli
pub(crate) fn get_cli() -> Result<ThinCli> {
    let mut cli = ThinCli::new()?;
    cli.add_subcommand(Box::new(EspCmd::new()?))?;
    cli.add_subcommand(Box::new(MacsecCmd::new()?))?;
    cli.add_subcommand(Box::new(KeygenCmd::new()?))?;
    cli.add_subcommand(Box::new(Complete::new()?))?;

    Ok(cli)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[derive(Debug, Default, Args)]
    struct Sub1 {
        #[arg(id = "sub1-arg", long)]
        someopt: Option<String>,
    }

    impl SubCommand for Sub1 {
        fn new() -> Result<Self> {
            Ok(Sub1 { someopt: None })
        }
        fn name(&self) -> String {
            "sub1".to_string()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
        fn full(&mut self) -> Result<Command> {
            Ok(Sub1::augment_args(
                Command::new("sub1")
                    .about("does some things")
                    .long_about("this is a longer description"),
            ))
        }
        fn update_from_arg_matches(&mut self, matches: &ArgMatches) -> Result<(), ClapError> {
            <Self as FromArgMatches>::update_from_arg_matches(self, matches)
        }
        fn runner(&self) -> Result<Box<dyn SubCommandRunner>> {
            Ok(Box::new(SubCommandRunnerFunc::new(|_: FullCli| Ok(()))))
        }
    }

    #[derive(Debug, Default, clap::Parser)]
    #[command(name = "sub2", about = "sub2 help")]
    struct Sub2 {
        #[arg(id = "sub2-flag", long)]
        flag: Option<bool>,
    }

    impl SubCommandParserRunner for Sub2 {
        fn run(&mut self, _: &MainConfig) -> Result<()> {
            Ok(())
        }
    }

    fn thin() -> Result<ThinCli> {
        let mut cli = ThinCli::new()?;
        cli.add_subcommand(Box::new(Sub1::new()?))?;
        cli.add_subcommand(Box::<Sub2>::default())?;
        Ok(cli)
    }

    #[test]
    fn cli_register_subcommands() -> Result<()> {
        let mut cli = ThinCli::new()?;
        assert!(cli.add_subcommand(Box::new(Sub1::new()?)).is_ok());
        assert!(cli.add_subcommand(Box::<Sub2>::default()).is_ok());
        assert!(cli.add_subcommand(Box::new(Sub1::new()?)).is_err());
        Ok(())
    }

    #[test]
    fn cli_build() -> Result<()> {
        let err = thin()?.build_from(vec!["p4sec", "--help"]);
        assert!(err.is_err() && err.unwrap_err().kind() == ErrorKind::DisplayHelp);

        let err = thin()?.build_from(vec!["p4sec"]);
        assert!(err.is_err());
        Ok(())
    }

    #[test]
    fn cli_log_level() -> Result<()> {
        let cli = thin()?.build_from(vec!["p4sec", "--log-level", "debug", "sub2"])?;
        assert_eq!(cli.main_config.log_level()?, LevelFilter::Debug);

        let cli = thin()?.build_from(vec!["p4sec", "sub2"])?;
        assert_eq!(cli.main_config.log_level()?, LevelFilter::Info);

        let config = MainConfig {
            log_level: "loud".to_string(),
        };
        assert!(config.log_level().is_err());
        Ok(())
    }

    #[test]
    fn cli_sub_help() -> Result<()> {
        // Subcommands are part of the thin command: their help is handled
        // in the first round.
        let res = thin()?.build_from(vec!["p4sec", "sub1", "--help"]);
        assert!(res.is_err() && res.unwrap_err().kind() == ErrorKind::DisplayHelp);

        let res = thin()?.build_from(vec!["p4sec", "sub2", "--help"]);
        assert!(res.is_err() && res.unwrap_err().kind() == ErrorKind::DisplayHelp);
        Ok(())
    }

    #[test]
    fn cli_sub_args() -> Result<()> {
        let cli = thin()?.build_from(vec!["p4sec", "sub1", "--sub1-arg", "foo"])?;
        assert!(cli.get_subcommand().name().eq("sub1"));

        let res = cli.run()?;
        assert!(res.subcommand.name().eq("sub1"));
        let sub1 = res.subcommand.as_any().downcast_ref::<Sub1>();
        assert!(sub1.is_some());
        assert!(sub1.unwrap().someopt.as_ref().unwrap().eq("foo"));
        Ok(())
    }

    #[test]
    fn cli_sub_args_err() -> Result<()> {
        let cli = thin()?.build_from(vec!["p4sec", "sub1", "--noexists", "foo"])?;
        assert!(cli.get_subcommand().name().eq("sub1"));

        let res = cli.run();
        assert!(res.is_err() && res.unwrap_err().kind() == ErrorKind::UnknownArgument);
        Ok(())
    }
}
