//! # Keygen
//!
//! Generates random key material for the security associations.

use anyhow::{bail, Result};
use clap::Parser;
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;

use p4sec::keygen::Algorithm;

use crate::cli::*;

#[derive(Parser, Debug, Default)]
#[command(
    name = "keygen",
    about = "Generate key material.",
    long_about = "Generate key material.

Keys are printed in hexadecimal, in the format expected by the security associations file."
)]
pub(crate) struct KeygenCmd {
    /// Comma separated list of algorithms to generate keys for
    #[arg(long, short, value_delimiter = ',', required = true)]
    algorithm: Vec<Algorithm>,
    /// Number of keys to generate per algorithm
    #[arg(long, short, default_value_t = 1)]
    count: usize,
    /// Print the keys as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct GeneratedKey {
    algorithm: Algorithm,
    key: String,
}

impl KeygenCmd {
    fn generate(&self, rng: &mut dyn RngCore) -> Result<Vec<GeneratedKey>> {
        if self.count == 0 {
            bail!("At least one key must be generated");
        }

        Ok(self
            .algorithm
            .iter()
            .flat_map(|algo| std::iter::repeat(*algo).take(self.count))
            .map(|algorithm| GeneratedKey {
                algorithm,
                key: hex::encode(algorithm.generate(rng)),
            })
            .collect())
    }
}

impl SubCommandParserRunner for KeygenCmd {
    fn run(&mut self, _: &MainConfig) -> Result<()> {
        let keys = self.generate(&mut OsRng)?;

        match self.json {
            true => println!("{}", serde_json::to_string_pretty(&keys)?),
            false => keys
                .iter()
                .for_each(|k| println!("{: <12} {}", k.algorithm, k.key)),
        }
        Ok(())
    }
}
