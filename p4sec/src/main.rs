use anyhow::Result;

mod cli;
mod commands;
mod generate;
mod helpers;
mod sa;

use crate::{cli::get_cli, helpers::logger::Logger};

fn main() -> Result<()> {
    let cli = get_cli()?.build();

    Logger::init(cli.main_config.log_level()?)?;

    let mut runner = cli.get_subcommand().runner()?;
    runner.run(cli)?;
    Ok(())
}
