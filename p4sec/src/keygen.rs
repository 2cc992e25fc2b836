//! # Key generation
//!
//! Random key material for the security associations, in the sizes the
//! transforms expect.

use std::{fmt, str::FromStr};

use anyhow::{bail, Result};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{
    core::keys::{ESP_AUTH_KEY_LEN, ESP_CIPHER_BLOB_LEN},
    macsec::frame::SAK_LEN,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Algorithm {
    /// ESP cipher key: AES-128 key and CTR nonce.
    #[value(name = "aes-ctr")]
    #[serde(rename = "aes-ctr")]
    AesCtr,
    /// ESP authentication key.
    #[value(name = "hmac-md5")]
    #[serde(rename = "hmac-md5")]
    HmacMd5,
    /// MACsec secure association key.
    #[value(name = "gcm-aes-128")]
    #[serde(rename = "gcm-aes-128")]
    GcmAes128,
}

impl Algorithm {
    pub fn key_len(&self) -> usize {
        match self {
            Algorithm::AesCtr => ESP_CIPHER_BLOB_LEN,
            Algorithm::HmacMd5 => ESP_AUTH_KEY_LEN,
            Algorithm::GcmAes128 => SAK_LEN,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::AesCtr => "aes-ctr",
            Algorithm::HmacMd5 => "hmac-md5",
            Algorithm::GcmAes128 => "gcm-aes-128",
        }
    }

    /// Generate a new key.
    pub fn generate(&self, rng: &mut dyn RngCore) -> Vec<u8> {
        let mut key = vec![0u8; self.key_len()];
        rng.fill_bytes(&mut key);
        key
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "aes-ctr" => Algorithm::AesCtr,
            "hmac-md5" => Algorithm::HmacMd5,
            "gcm-aes-128" => Algorithm::GcmAes128,
            x => bail!("Unknown algorithm: {x}"),
        })
    }
}
