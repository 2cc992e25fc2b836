//! # ESP frame
//!
//! Encoding helpers for tunnel-mode ESP with AES-CTR (RFC 3686) and
//! HMAC-MD5-96. On the wire, after the ESP header, the payload is:
//!
//! ```text
//! IV (8) || AES-CTR(inner IPv4 packet || padding || pad length || next header) || ICV (12)
//! ```
//!
//! and the ICV covers the ESP header, the IV and the ciphertext.

use p4sec_pnet::{
    ip::{IpNextHeaderProtocol, IpNextHeaderProtocols},
    ipsec::{
        EspTrailerPacket, MutableEspTrailerPacket, ESP_HEADER_LEN,
        ESP_TRAILER_LEN,
    },
};

use crate::{
    core::{error::need, HeaderFields, Result, TransformError, ESP, IPV4},
    crypto::{ctr::AES_BLOCK_LEN, icv::ICV_LEN},
};

pub const ESP_IV_LEN: usize = 8;
pub const ESP_ICV_LEN: usize = ICV_LEN;
pub const IPV4_HEADER_LEN: usize = 20;
/// Outer IPv4 header and ESP header, added in front of the ESP payload.
pub const ESP_OUTER_OVERHEAD: usize = IPV4_HEADER_LEN + ESP_HEADER_LEN;
/// Smallest ESP payload that can be decoded: IV, trailer and ICV.
pub const ESP_MIN_PAYLOAD_LEN: usize = ESP_IV_LEN + ESP_TRAILER_LEN + ESP_ICV_LEN;
/// Protocol of the encapsulated packet.
pub const ESP_NEXT_HEADER: IpNextHeaderProtocol = IpNextHeaderProtocols::IpIp;

/// Number of padding bytes so that the padded plaintext, trailer included,
/// is a multiple of the AES block size.
pub fn pad_len(len: usize) -> usize {
    (AES_BLOCK_LEN - (len + ESP_TRAILER_LEN) % AES_BLOCK_LEN) % AES_BLOCK_LEN
}

/// Append the padding and the trailer to a plaintext datagram.
pub fn append_trailer(datagram: &mut Vec<u8>) {
    let pad = pad_len(datagram.len());
    let start = datagram.len() + pad;
    datagram.resize(start + ESP_TRAILER_LEN, 0);

    // The buffer was just sized to hold the trailer.
    if let Some(mut trailer) = MutableEspTrailerPacket::new(&mut datagram[start..]) {
        trailer.set_pad_length(pad as u8);
        trailer.set_next_header(ESP_NEXT_HEADER);
    }
}

/// Remove padding and trailer from a decrypted payload. Returns the inner
/// datagram and the next header value.
pub fn strip_trailer(decrypted: &[u8]) -> Result<(&[u8], IpNextHeaderProtocol)> {
    need("ESP trailer", ESP_TRAILER_LEN, decrypted.len())?;
    let end = decrypted.len() - ESP_TRAILER_LEN;

    let trailer = EspTrailerPacket::new(&decrypted[end..]).ok_or(TransformError::Truncated {
        what: "ESP trailer",
        needed: ESP_TRAILER_LEN,
        available: decrypted.len(),
    })?;
    let pad = trailer.get_pad_length() as usize;
    if pad > end {
        return Err(TransformError::BadPadding {
            pad_len: pad,
            available: decrypted.len(),
        });
    }

    Ok((&decrypted[..end - pad], trailer.get_next_header()))
}

/// Build the RFC 3686 counter block: nonce || IV || block counter (1).
pub fn counter_block(nonce: &[u8; 4], iv: &[u8; ESP_IV_LEN]) -> [u8; AES_BLOCK_LEN] {
    let mut block = [0u8; AES_BLOCK_LEN];
    block[..4].copy_from_slice(nonce);
    block[4..12].copy_from_slice(iv);
    block[15] = 1;
    block
}

/// Serialize the ESP header from its parsed fields.
pub fn esp_header(esp: &dyn HeaderFields) -> Result<[u8; ESP_HEADER_LEN]> {
    let raw = ESP.pack(esp)?;
    raw.as_slice()
        .try_into()
        .map_err(|_| TransformError::LengthMismatch {
            what: "ESP header",
            expected: ESP_HEADER_LEN,
            got: raw.len(),
        })
}

/// Rebuild the inner IPv4 header from its fields.
pub fn ipv4_header(ipv4: &dyn HeaderFields) -> Result<Vec<u8>> {
    let raw = IPV4.pack(ipv4)?;
    if raw.len() != IPV4_HEADER_LEN {
        return Err(TransformError::LengthMismatch {
            what: "IPv4 header",
            expected: IPV4_HEADER_LEN,
            got: raw.len(),
        });
    }
    Ok(raw)
}

/// ESP payload as found in the packet buffer, split in its parts.
#[derive(Debug)]
pub struct EspWire<'a> {
    pub iv: [u8; ESP_IV_LEN],
    pub ciphertext: &'a [u8],
    pub icv: &'a [u8],
}

impl<'a> EspWire<'a> {
    pub fn split(payload: &'a [u8]) -> Result<Self> {
        need("ESP payload", ESP_MIN_PAYLOAD_LEN, payload.len())?;

        let (iv, rest) = payload.split_at(ESP_IV_LEN);
        let (ciphertext, icv) = rest.split_at(rest.len() - ESP_ICV_LEN);
        let mut iv_arr = [0u8; ESP_IV_LEN];
        iv_arr.copy_from_slice(iv);

        Ok(Self {
            iv: iv_arr,
            ciphertext,
            icv,
        })
    }
}
