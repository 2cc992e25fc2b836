//! # SecTAG
//!
//! Helpers for the controller side: the pipeline receives the SecTAG and
//! the SCI as opaque table values, they are built here.

use p4sec_pnet::{
    ethernet::EtherTypes,
    macsec::{
        MutableSecTagPacket, MACSEC_SECTAG_LEN, MACSEC_SHORT_LEN_MAX, MACSEC_TCI_C,
        MACSEC_TCI_E, MACSEC_TCI_SC,
    },
};

use super::frame::{MAC_LEN, SCI_LEN};
use crate::core::{Result, TransformError};

/// Port identifier used when none is configured.
pub const DEFAULT_PORT: u16 = 1;

/// Build a SCI from the system MAC address and a port identifier.
pub fn sci_from(mac: &[u8; MAC_LEN], port: u16) -> [u8; SCI_LEN] {
    let mut sci = [0u8; SCI_LEN];
    sci[..MAC_LEN].copy_from_slice(mac);
    sci[MAC_LEN..].copy_from_slice(&port.to_be_bytes());
    sci
}

/// Builder for 16 bytes SecTAGs, always carrying the SCI.
#[derive(Debug, Clone)]
pub struct SecTagBuilder {
    sci: [u8; SCI_LEN],
    pn: u32,
    an: u8,
    encrypted: bool,
    secure_data_len: Option<usize>,
}

impl SecTagBuilder {
    pub fn new(sci: [u8; SCI_LEN], pn: u32) -> Self {
        Self {
            sci,
            pn,
            an: 0,
            encrypted: true,
            secure_data_len: None,
        }
    }

    pub fn association_number(mut self, an: u8) -> Self {
        self.an = an;
        self
    }

    /// Set the E and C bits (default) or leave them cleared for
    /// integrity-only channels.
    pub fn encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    /// Length of the secure data, used to fill the short length field.
    pub fn secure_data_len(mut self, len: usize) -> Self {
        self.secure_data_len = Some(len);
        self
    }

    pub fn build(&self) -> Result<[u8; MACSEC_SECTAG_LEN]> {
        if self.an > 3 {
            return Err(TransformError::FieldOverflow {
                name: "association_number".to_string(),
                bits: 2,
            });
        }

        let mut raw = [0u8; MACSEC_SECTAG_LEN];
        let mut sectag =
            MutableSecTagPacket::new(&mut raw).ok_or(TransformError::LengthMismatch {
                what: "SecTAG",
                expected: MACSEC_SECTAG_LEN,
                got: 0,
            })?;

        let mut tci = MACSEC_TCI_SC;
        if self.encrypted {
            tci |= MACSEC_TCI_E | MACSEC_TCI_C;
        }
        sectag.set_ethertype(EtherTypes::Macsec);
        sectag.set_tci(tci);
        sectag.set_association_number(self.an);
        sectag.set_short_length(match self.secure_data_len {
            Some(len) if len < MACSEC_SHORT_LEN_MAX => len as u8,
            _ => 0,
        });
        sectag.set_packet_number(self.pn);
        sectag.set_sci(&self.sci);

        Ok(raw)
    }
}
