//! Packet files handling, shared by the commands acting as the pipeline.

use std::{fs, path::PathBuf};

use anyhow::{anyhow, Result};
use clap::{Args, ValueEnum};
use log::debug;
use serde::Serializer;

/// On-disk representation of the packets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum PacketFormat {
    /// Raw bytes.
    #[default]
    Raw,
    /// Hexadecimal string, white spaces are ignored.
    Hex,
}

#[derive(Args, Debug, Default)]
pub(crate) struct PacketArgs {
    /// Security associations file (YAML)
    #[arg(long, short)]
    pub(crate) sa: PathBuf,
    /// File to read the packet from
    #[arg(long, short)]
    pub(crate) input: PathBuf,
    /// File to write the resulting packet to, if not dropped
    #[arg(long, short)]
    pub(crate) output: Option<PathBuf>,
    /// Format of the input and output files
    #[arg(long, value_enum, default_value_t = PacketFormat::Raw)]
    pub(crate) format: PacketFormat,
}

impl PacketArgs {
    pub(crate) fn read(&self) -> Result<Vec<u8>> {
        let contents = fs::read(&self.input)
            .map_err(|e| anyhow!("Could not read {}: {e}", self.input.display()))?;
        let packet = decode(self.format, &contents)?;
        debug!("Read a {} bytes packet from {}", packet.len(), self.input.display());
        Ok(packet)
    }

    pub(crate) fn write(&self, packet: &[u8]) -> Result<()> {
        if let Some(path) = &self.output {
            fs::write(path, encode(self.format, packet))
                .map_err(|e| anyhow!("Could not write {}: {e}", path.display()))?;
            debug!("Wrote a {} bytes packet to {}", packet.len(), path.display());
        }
        Ok(())
    }
}

pub(crate) fn decode(format: PacketFormat, contents: &[u8]) -> Result<Vec<u8>> {
    Ok(match format {
        PacketFormat::Raw => contents.to_vec(),
        PacketFormat::Hex => {
            let text: Vec<u8> = contents
                .iter()
                .filter(|c| !c.is_ascii_whitespace())
                .copied()
                .collect();
            hex::decode(text)?
        }
    })
}

pub(crate) fn encode(format: PacketFormat, packet: &[u8]) -> Vec<u8> {
    match format {
        PacketFormat::Raw => packet.to_vec(),
        PacketFormat::Hex => format!("{}\n", hex::encode(packet)).into_bytes(),
    }
}

/// Serialize optional bytes as an hexadecimal string.
pub(crate) fn serialize_hex<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match bytes {
        Some(bytes) => serializer.serialize_str(&hex::encode(bytes)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_format() {
        assert_eq!(
            decode(PacketFormat::Hex, b"4500 0054\n 0a0b\n").unwrap(),
            vec![0x45, 0, 0, 0x54, 0xa, 0xb]
        );
        assert!(decode(PacketFormat::Hex, b"450").is_err());
        assert_eq!(encode(PacketFormat::Hex, &[0xde, 0xad]), b"dead\n".to_vec());
    }

    #[test]
    fn raw_format() {
        assert_eq!(decode(PacketFormat::Raw, b"\x00\x01").unwrap(), vec![0, 1]);
        assert_eq!(encode(PacketFormat::Raw, &[0, 1]), vec![0, 1]);
    }
}
