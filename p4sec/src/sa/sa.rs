use std::{fs::read_to_string, path::Path};

use anyhow::{anyhow, bail, Result};
use log::warn;
use serde::{de, Deserialize, Deserializer};

use p4sec::{
    core::keys::{ESP_AUTH_KEY_LEN, ESP_CIPHER_BLOB_LEN},
    macsec::{
        frame::{SAK_LEN, SCI_LEN},
        sectag::{sci_from, DEFAULT_PORT},
    },
};

use crate::helpers::net::parse_eth_addr;

/// Security associations file.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct SaConfig {
    /// Version of the file format.
    pub(crate) version: String,
    pub(crate) esp: Option<EspSa>,
    pub(crate) macsec: Option<MacsecSa>,
}

/// ESP security association.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct EspSa {
    pub(crate) spi: u32,
    #[serde(default = "default_counter")]
    pub(crate) seq: u32,
    /// AES-128 key and CTR nonce.
    #[serde(deserialize_with = "hex_bytes")]
    pub(crate) cipher_key: Vec<u8>,
    /// HMAC-MD5 key.
    #[serde(deserialize_with = "hex_bytes")]
    pub(crate) auth_key: Vec<u8>,
}

/// MACsec secure association.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct MacsecSa {
    #[serde(deserialize_with = "hex_bytes")]
    pub(crate) sak: Vec<u8>,
    /// Explicit SCI. If not set, the SCI is built from the system MAC
    /// address (or the frame source address) and the port.
    #[serde(default, deserialize_with = "opt_hex_bytes")]
    pub(crate) sci: Option<Vec<u8>>,
    #[serde(default, deserialize_with = "opt_eth_addr")]
    pub(crate) system_mac: Option<[u8; 6]>,
    #[serde(default = "default_port")]
    pub(crate) port: u16,
    #[serde(default = "default_counter")]
    pub(crate) pn: u32,
    #[serde(default)]
    pub(crate) an: u8,
    /// Explicit SecTAG, built from the above otherwise.
    #[serde(default, deserialize_with = "opt_hex_bytes")]
    pub(crate) sectag: Option<Vec<u8>>,
}

fn default_counter() -> u32 {
    1
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|e| anyhow!("invalid hex string '{s}': {e}"))
}

fn hex_bytes<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    decode_hex(&s).map_err(de::Error::custom)
}

fn opt_hex_bytes<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| decode_hex(&s).map_err(de::Error::custom))
        .transpose()
}

fn opt_eth_addr<'de, D>(deserializer: D) -> Result<Option<[u8; 6]>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| parse_eth_addr(&s).map_err(de::Error::custom))
        .transpose()
}

impl SaConfig {
    /// Load the security associations from a path.
    pub(crate) fn load(path: &Path) -> Result<SaConfig> {
        let contents = read_to_string(path)
            .map_err(|e| anyhow!("Could not read {}: {e}", path.display()))?;
        let config = SaConfig::from_str(contents.as_str())?;
        Ok(config)
    }

    /// Load the security associations from a string.
    pub(crate) fn from_str(contents: &str) -> Result<SaConfig> {
        let config: SaConfig = serde_yaml::from_str(contents)?;
        if !config.version.starts_with("1.") {
            bail!("Unsupported security associations version {}", config.version);
        }

        if let Some(esp) = &config.esp {
            check_len("ESP cipher key", &esp.cipher_key, ESP_CIPHER_BLOB_LEN);
            check_len("ESP auth key", &esp.auth_key, ESP_AUTH_KEY_LEN);
        }
        if let Some(macsec) = &config.macsec {
            check_len("MACsec SAK", &macsec.sak, SAK_LEN);
            if let Some(sci) = &macsec.sci {
                check_len("MACsec SCI", sci, SCI_LEN);
            }
            if macsec.an > 3 {
                bail!("MACsec association number must be in 0..=3");
            }
        }
        Ok(config)
    }

    pub(crate) fn esp(&self) -> Result<&EspSa> {
        self.esp
            .as_ref()
            .ok_or_else(|| anyhow!("No ESP security association defined"))
    }

    pub(crate) fn macsec(&self) -> Result<&MacsecSa> {
        self.macsec
            .as_ref()
            .ok_or_else(|| anyhow!("No MACsec secure association defined"))
    }
}

impl MacsecSa {
    /// SCI of the channel, `src_mac` being used when neither an explicit SCI
    /// nor the system MAC address are configured.
    pub(crate) fn sci(&self, src_mac: &[u8; 6]) -> Vec<u8> {
        match &self.sci {
            Some(sci) => sci.clone(),
            None => sci_from(self.system_mac.as_ref().unwrap_or(src_mac), self.port).to_vec(),
        }
    }
}

// Keys are normalized by the transforms; only let the user know.
fn check_len(what: &str, key: &[u8], expected: usize) {
    if key.len() != expected {
        warn!(
            "{what} is {} bytes long, it will be {} to {expected} bytes",
            key.len(),
            if key.len() < expected {
                "padded"
            } else {
                "truncated"
            }
        );
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn load_file() {
        let sa = SaConfig::load(&PathBuf::from("test_data/sa/example.yaml")).unwrap();
        assert_eq!(sa.version, "1.0.0");

        let esp = sa.esp().unwrap();
        assert_eq!(esp.spi, 4096);
        assert_eq!(esp.seq, 1);
        assert_eq!(esp.cipher_key, vec![b'A'; 20]);
        assert_eq!(esp.auth_key, vec![b'B'; 16]);

        let macsec = sa.macsec().unwrap();
        assert_eq!(macsec.sak.len(), 16);
        assert_eq!(macsec.system_mac, Some([2, 0, 0, 0, 0, 1]));
        assert_eq!(macsec.sci(&[0xff; 6]), vec![2, 0, 0, 0, 0, 1, 0, 1]);
        assert!(macsec.sectag.is_none());
    }

    #[test]
    fn defaults() {
        let sa = SaConfig::from_str(
            "
version: 1.0.0
macsec:
  sak: '0x42'
",
        )
        .unwrap();
        assert!(sa.esp().is_err());

        let macsec = sa.macsec().unwrap();
        assert_eq!(macsec.sak, vec![0x42]);
        assert_eq!(macsec.pn, 1);
        assert_eq!(macsec.an, 0);
        assert_eq!(macsec.port, DEFAULT_PORT);
        assert_eq!(
            macsec.sci(&[0xa, 0xb, 0xc, 0xd, 0xe, 0xf]),
            vec![0xa, 0xb, 0xc, 0xd, 0xe, 0xf, 0, 1]
        );
    }

    #[test]
    fn explicit_sci() {
        let sa = SaConfig::from_str(
            "
version: 1.0.0
macsec:
  sak: '00'
  sci: '0102030405060708'
  system_mac: '02:00:00:00:00:01'
",
        )
        .unwrap();
        assert_eq!(
            sa.macsec().unwrap().sci(&[0; 6]),
            vec![1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn invalid_files() {
        // Not hex.
        assert!(SaConfig::from_str("version: 1.0.0\nmacsec:\n  sak: xyz\n").is_err());
        // Unknown field.
        assert!(SaConfig::from_str("version: 1.0.0\nfoo: bar\n").is_err());
        // Unsupported version.
        assert!(SaConfig::from_str("version: 2.0.0\n").is_err());
        // Missing key.
        assert!(SaConfig::from_str("version: 1.0.0\nesp:\n  spi: 1\n  auth_key: '00'\n").is_err());
        // Bad MAC address.
        assert!(SaConfig::from_str(
            "version: 1.0.0\nmacsec:\n  sak: '00'\n  system_mac: '02:00:00'\n"
        )
        .is_err());
        // Association number out of range.
        assert!(SaConfig::from_str("version: 1.0.0\nmacsec:\n  sak: '00'\n  an: 4\n").is_err());
    }
}
