//! # ESP
//!
//! Tunnel-mode IPsec ESP transform: AES-128-CTR confidentiality and
//! HMAC-MD5-96 integrity. The pipeline strips the inner IPv4 header into
//! header fields before calling `encrypt_aes_ctr`, and expects the inner
//! header fields to be written back by `decrypt_aes_ctr`.

use log::{debug, warn};
use rand::{rngs::OsRng, RngCore};

pub mod frame;
use frame::*;

use crate::{
    core::{
        error::need,
        keys::{EspAuthKey, EspCipherKey},
        mark_drop, HeaderFields, PacketBuffer, Result, TransformError, IPV4,
    },
    crypto::{
        ctr::{apply_keystream, AES_BLOCK_LEN},
        icv,
    },
};

/// Outcome of the ICV check on decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcvStatus {
    Valid,
    /// The packet was decrypted anyway and flagged for dropping in the
    /// standard metadata.
    Mismatch,
}

impl IcvStatus {
    pub fn is_valid(&self) -> bool {
        *self == IcvStatus::Valid
    }
}

/// ESP transform, as invoked by the pipeline.
pub struct EspCrypt {
    /// Source of the per-packet IVs.
    rng: Box<dyn RngCore + Send>,
}

impl Default for EspCrypt {
    fn default() -> Self {
        Self::new()
    }
}

impl EspCrypt {
    pub fn new() -> Self {
        Self::with_rng(Box::new(OsRng))
    }

    pub fn with_rng(rng: Box<dyn RngCore + Send>) -> Self {
        Self { rng }
    }

    /// Encapsulate the current packet.
    ///
    /// The inner IPv4 header is rebuilt from `ipv4` and prepended to the
    /// packet payload. The payload is then replaced by the ESP payload and
    /// `ipv4.totalLen` is updated for the outer header.
    pub fn encrypt_aes_ctr(
        &mut self,
        packet: &mut dyn PacketBuffer,
        ipv4: &mut dyn HeaderFields,
        esp: &dyn HeaderFields,
        cipher_key: &[u8],
        auth_key: &[u8],
    ) -> Result<()> {
        let cipher_key = EspCipherKey::from_blob(cipher_key);
        let auth_key = EspAuthKey::from_blob(auth_key);
        let header = esp_header(esp)?;

        let mut datagram = ipv4_header(ipv4)?;
        datagram.extend_from_slice(packet.data());
        let inner_len = datagram.len();
        append_trailer(&mut datagram);
        if datagram.len() % AES_BLOCK_LEN != 0 {
            return Err(TransformError::LengthMismatch {
                what: "padded ESP plaintext",
                expected: datagram.len().next_multiple_of(AES_BLOCK_LEN),
                got: datagram.len(),
            });
        }

        let mut iv = [0u8; ESP_IV_LEN];
        self.rng
            .try_fill_bytes(&mut iv)
            .map_err(|_| TransformError::Crypto("IV generation"))?;
        apply_keystream(
            &cipher_key.key,
            &counter_block(&cipher_key.nonce, &iv),
            &mut datagram,
        );
        let icv = icv::compute(&auth_key.0, &[&header, &iv, &datagram])?;

        let mut wire = Vec::with_capacity(ESP_IV_LEN + datagram.len() + ESP_ICV_LEN);
        wire.extend_from_slice(&iv);
        wire.extend_from_slice(&datagram);
        wire.extend_from_slice(&icv);

        // Update the outer header first: the packet must be left untouched
        // if the new length does not fit.
        ipv4.set_uint("totalLen", (wire.len() + ESP_OUTER_OVERHEAD) as u64)?;
        debug!(
            "esp: encapsulated {inner_len} bytes into {} bytes (spi {:#x})",
            wire.len(),
            esp.get_uint("spi")?
        );
        packet.replace(wire);
        Ok(())
    }

    /// Decapsulate the current packet.
    ///
    /// On ICV mismatch the packet is flagged for dropping in `metadata` but
    /// still decrypted, the pipeline being in charge of the drop. Malformed
    /// frames are flagged as well and reported as an error; the packet and
    /// `ipv4` are then left untouched.
    pub fn decrypt_aes_ctr(
        &self,
        packet: &mut dyn PacketBuffer,
        ipv4: &mut dyn HeaderFields,
        esp: &dyn HeaderFields,
        metadata: &mut dyn HeaderFields,
        cipher_key: &[u8],
        auth_key: &[u8],
    ) -> Result<IcvStatus> {
        let ret = Self::try_decrypt(packet, ipv4, esp, metadata, cipher_key, auth_key);

        if let Err(e) = &ret {
            if e.is_malformed() {
                warn!("esp: dropping packet: {e}");
                mark_drop(metadata)?;
            }
        }
        ret
    }

    fn try_decrypt(
        packet: &mut dyn PacketBuffer,
        ipv4: &mut dyn HeaderFields,
        esp: &dyn HeaderFields,
        metadata: &mut dyn HeaderFields,
        cipher_key: &[u8],
        auth_key: &[u8],
    ) -> Result<IcvStatus> {
        let cipher_key = EspCipherKey::from_blob(cipher_key);
        let auth_key = EspAuthKey::from_blob(auth_key);
        let header = esp_header(esp)?;

        let wire = EspWire::split(packet.data())?;
        let authenticated = icv::verify(
            &auth_key.0,
            &[&header, &wire.iv, wire.ciphertext],
            wire.icv,
        )?;
        let status = match authenticated {
            true => IcvStatus::Valid,
            false => {
                warn!(
                    "esp: ICV mismatch (spi {:#x}, seq {})",
                    esp.get_uint("spi")?,
                    esp.get_uint("seqNo")?
                );
                mark_drop(metadata)?;
                IcvStatus::Mismatch
            }
        };

        let mut decrypted = wire.ciphertext.to_vec();
        apply_keystream(
            &cipher_key.key,
            &counter_block(&cipher_key.nonce, &wire.iv),
            &mut decrypted,
        );

        let (inner, next_header) = strip_trailer(&decrypted)?;
        if next_header != ESP_NEXT_HEADER {
            debug!("esp: unexpected next header {next_header}");
        }
        need("inner IPv4 header", IPV4_HEADER_LEN, inner.len())?;

        IPV4.unpack(&inner[..IPV4_HEADER_LEN], ipv4)?;
        debug!(
            "esp: decapsulated {} bytes, inner payload is {} bytes",
            decrypted.len(),
            inner.len() - IPV4_HEADER_LEN
        );
        packet.replace(inner[IPV4_HEADER_LEN..].to_vec());
        Ok(status)
    }
}
