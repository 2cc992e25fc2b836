//! # MACsec
//!
//! GCM-AES-128 protection and validation of the frame payload. The
//! pipeline handles the Ethernet header and the SecTAG itself, the
//! transforms only see the payload and the secure channel parameters.

use log::{debug, warn};

pub mod frame;
pub use frame::{parse_prepend_flag, RawSecureChannel, SecureChannel};
pub mod sectag;

use frame::*;

use crate::{
    core::{error::need, PacketBuffer, Result, TransformError},
    crypto::gcm::{self, GCM_TAG_LEN},
};

/// Outcome of a MACsec validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// Did the authentication tag match?
    pub valid: bool,
    /// Recovered EtherType as a lowercase hex string, empty when the frame
    /// is not valid.
    pub ethertype: String,
}

/// MACsec transform, as invoked by the pipeline.
#[derive(Debug, Default)]
pub struct MacsecCrypt;

impl MacsecCrypt {
    pub fn new() -> Self {
        Self
    }

    /// Protect the current payload, which becomes the secure data followed
    /// by the ICV. The IPv4 header is only protected if `prepend_flag` is
    /// "T".
    pub fn protect(
        &self,
        packet: &mut dyn PacketBuffer,
        channel: &RawSecureChannel,
        ethertype: &[u8],
        prepend_flag: &str,
        ipv4_hdr: &[u8],
    ) -> Result<()> {
        let channel = SecureChannel::from(channel);
        let ipv4_hdr = parse_prepend_flag(prepend_flag).then_some(ipv4_hdr);

        let plaintext = user_data(ethertype, ipv4_hdr, packet.data());
        let mut secure_data = plaintext.clone();
        let icv = gcm::seal(
            &channel.sak,
            &channel.nonce(),
            &channel.aad(),
            &mut secure_data,
        )?;
        if secure_data.len() != plaintext.len() {
            return Err(TransformError::LengthMismatch {
                what: "MACsec secure data",
                expected: plaintext.len(),
                got: secure_data.len(),
            });
        }

        debug!(
            "macsec: protected {} bytes (ipv4 header {})",
            plaintext.len(),
            if ipv4_hdr.is_some() { "included" } else { "not included" }
        );
        secure_data.extend_from_slice(&icv);
        packet.replace(secure_data);
        Ok(())
    }

    /// Validate and decrypt the current payload. The packet is only
    /// modified if the frame is valid; it then holds the user data without
    /// its EtherType.
    pub fn validate(
        &self,
        packet: &mut dyn PacketBuffer,
        channel: &RawSecureChannel,
    ) -> Result<Validation> {
        let channel = SecureChannel::from(channel);

        let data = packet.data();
        need("MACsec ICV", GCM_TAG_LEN, data.len())?;
        let (secure_data, icv) = data.split_at(data.len() - GCM_TAG_LEN);
        let mut tag = [0u8; GCM_TAG_LEN];
        tag.copy_from_slice(icv);

        // Decryption happens before the tag check: work on a copy.
        let mut decrypted = secure_data.to_vec();
        if !gcm::open(
            &channel.sak,
            &channel.nonce(),
            &channel.aad(),
            &mut decrypted,
            &tag,
        ) {
            warn!(
                "macsec: authentication failed (sci {})",
                hex::encode(channel.sci)
            );
            return Ok(Validation {
                valid: false,
                ethertype: String::new(),
            });
        }
        if decrypted.len() != secure_data.len() {
            return Err(TransformError::LengthMismatch {
                what: "MACsec user data",
                expected: secure_data.len(),
                got: decrypted.len(),
            });
        }
        need("MACsec EtherType", ETHERTYPE_LEN, decrypted.len())?;

        let ethertype = hex::encode(&decrypted[..ETHERTYPE_LEN]);
        debug!(
            "macsec: validated {} bytes, ethertype {ethertype}",
            decrypted.len()
        );
        packet.replace(decrypted.split_off(ETHERTYPE_LEN));
        Ok(Validation {
            valid: true,
            ethertype,
        })
    }
}
