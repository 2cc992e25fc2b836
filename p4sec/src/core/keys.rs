//! # Keys
//!
//! Key material reaches the transforms as untrusted byte strings coming from
//! table configuration. The configuration tooling strips leading zero bytes,
//! so short keys are left-padded with zeros; over-long keys keep their first
//! bytes. Mismatched lengths are never an error: this is the historical
//! contract of the table entries and must be kept for compatibility.

use log::debug;

/// Normalize `raw` to exactly `width` bytes.
pub fn normalize(raw: &[u8], width: usize) -> Vec<u8> {
    if raw.len() >= width {
        if raw.len() > width {
            debug!("key material truncated from {} to {width} bytes", raw.len());
        }
        return raw[..width].to_vec();
    }

    debug!("key material padded from {} to {width} bytes", raw.len());
    let mut out = vec![0u8; width - raw.len()];
    out.extend_from_slice(raw);
    out
}

/// Same as `normalize` but for fixed-width fields.
pub fn normalize_array<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&normalize(raw, N));
    out
}

/// Length of the ESP cipher blob: AES-128 key followed by the RFC 3686 nonce.
pub const ESP_CIPHER_BLOB_LEN: usize = 20;
/// Length of the HMAC-MD5 key.
pub const ESP_AUTH_KEY_LEN: usize = 16;

/// AES-CTR key material of an ESP security association.
#[derive(Clone)]
pub struct EspCipherKey {
    pub key: [u8; 16],
    pub nonce: [u8; 4],
}

impl EspCipherKey {
    /// Build the key from the 20 bytes blob. The whole blob is normalized
    /// first, then split: a short blob loses bytes at the head of the key,
    /// never in the nonce.
    pub fn from_blob(raw: &[u8]) -> Self {
        let blob: [u8; ESP_CIPHER_BLOB_LEN] = normalize_array(raw);
        let mut key = [0u8; 16];
        let mut nonce = [0u8; 4];
        key.copy_from_slice(&blob[..16]);
        nonce.copy_from_slice(&blob[16..]);
        Self { key, nonce }
    }
}

/// Integrity key of an ESP security association.
#[derive(Clone)]
pub struct EspAuthKey(pub [u8; ESP_AUTH_KEY_LEN]);

impl EspAuthKey {
    pub fn from_blob(raw: &[u8]) -> Self {
        Self(normalize_array(raw))
    }
}
