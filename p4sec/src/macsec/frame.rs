//! # MACsec frame
//!
//! GCM-AES-128 framing as done by the pipeline (IEEE 802.1AE): the secure
//! data covers the EtherType and the user payload, the Ethernet addresses
//! and the SecTAG are only authenticated.

use crate::core::keys::normalize_array;

pub const SAK_LEN: usize = 16;
pub const SCI_LEN: usize = p4sec_pnet::macsec::MACSEC_SCI_LEN;
pub const PN_LEN: usize = 4;
pub const MAC_LEN: usize = 6;
pub const SECTAG_LEN: usize = p4sec_pnet::macsec::MACSEC_SECTAG_LEN;
pub const ETHERTYPE_LEN: usize = 2;
pub const IPV4_HDR_LEN: usize = 20;
pub const AAD_LEN: usize = 2 * MAC_LEN + SECTAG_LEN;

/// Value of the prepend flag asking for the IPv4 header to be protected.
pub const PREPEND_FLAG_TRUE: &str = "T";

/// Secure channel parameters as found in the pipeline tables: byte strings
/// of any length.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawSecureChannel<'a> {
    pub sak: &'a [u8],
    pub sci: &'a [u8],
    pub pn: &'a [u8],
    pub src_mac: &'a [u8],
    pub dst_mac: &'a [u8],
    pub sectag: &'a [u8],
}

/// Secure channel parameters, each normalized to its own width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureChannel {
    pub sak: [u8; SAK_LEN],
    pub sci: [u8; SCI_LEN],
    pub pn: [u8; PN_LEN],
    pub src_mac: [u8; MAC_LEN],
    pub dst_mac: [u8; MAC_LEN],
    pub sectag: [u8; SECTAG_LEN],
}

impl From<&RawSecureChannel<'_>> for SecureChannel {
    fn from(raw: &RawSecureChannel<'_>) -> Self {
        Self {
            sak: normalize_array(raw.sak),
            sci: normalize_array(raw.sci),
            pn: normalize_array(raw.pn),
            src_mac: normalize_array(raw.src_mac),
            dst_mac: normalize_array(raw.dst_mac),
            sectag: normalize_array(raw.sectag),
        }
    }
}

impl SecureChannel {
    /// GCM nonce: SCI || PN.
    pub fn nonce(&self) -> [u8; SCI_LEN + PN_LEN] {
        let mut nonce = [0u8; SCI_LEN + PN_LEN];
        nonce[..SCI_LEN].copy_from_slice(&self.sci);
        nonce[SCI_LEN..].copy_from_slice(&self.pn);
        nonce
    }

    /// Additional authenticated data: destination MAC || source MAC || SecTAG.
    pub fn aad(&self) -> [u8; AAD_LEN] {
        let mut aad = [0u8; AAD_LEN];
        aad[..MAC_LEN].copy_from_slice(&self.dst_mac);
        aad[MAC_LEN..2 * MAC_LEN].copy_from_slice(&self.src_mac);
        aad[2 * MAC_LEN..].copy_from_slice(&self.sectag);
        aad
    }
}

/// Build the data to protect: EtherType, the IPv4 header if any, then the
/// payload. The EtherType and the IPv4 header are normalized to their
/// widths.
pub fn user_data(ethertype: &[u8], ipv4_hdr: Option<&[u8]>, payload: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(ETHERTYPE_LEN + IPV4_HDR_LEN + payload.len());
    data.extend_from_slice(&normalize_array::<ETHERTYPE_LEN>(ethertype));
    if let Some(hdr) = ipv4_hdr {
        data.extend_from_slice(&normalize_array::<IPV4_HDR_LEN>(hdr));
    }
    data.extend_from_slice(payload);
    data
}

/// The pipeline passes booleans as strings: only "T" is true.
pub fn parse_prepend_flag(flag: &str) -> bool {
    flag == PREPEND_FLAG_TRUE
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn channel() -> SecureChannel {
        SecureChannel::from(&RawSecureChannel {
            sak: &[0x11; 16],
            sci: &[1, 2, 3, 4, 5, 6, 0, 1],
            pn: &[0, 0, 0, 7],
            src_mac: &[0xa, 0xb, 0xc, 0xd, 0xe, 0xf],
            dst_mac: &[1, 1, 1, 1, 1, 1],
            sectag: &[0x88, 0xe5, 0x2c, 0, 0, 0, 0, 7, 1, 2, 3, 4, 5, 6, 0, 1],
        })
    }

    #[test]
    fn nonce_layout() {
        assert_eq!(channel().nonce(), [1, 2, 3, 4, 5, 6, 0, 1, 0, 0, 0, 7]);
    }

    #[test]
    fn aad_layout() {
        let aad = channel().aad();
        assert_eq!(aad[..6], [1; 6]);
        assert_eq!(aad[6..12], [0xa, 0xb, 0xc, 0xd, 0xe, 0xf]);
        assert_eq!(aad[12..14], [0x88, 0xe5]);
        assert_eq!(aad.len(), 28);
    }

    #[test]
    fn fields_are_normalized_independently() {
        let ch = SecureChannel::from(&RawSecureChannel {
            pn: &[5],
            src_mac: &[0xff; 8],
            ..Default::default()
        });
        assert_eq!(ch.sak, [0; 16]);
        assert_eq!(ch.pn, [0, 0, 0, 5]);
        assert_eq!(ch.src_mac, [0xff; 6]);
        assert_eq!(ch.sectag, [0; 16]);
    }

    #[test]
    fn user_data_layout() {
        assert_eq!(user_data(&[0x08, 0x00], None, &[1, 2]), vec![0x08, 0, 1, 2]);
        // Leading zero stripped by the tables.
        assert_eq!(user_data(&[0x06], None, &[]), vec![0, 6]);

        let hdr = [0x45; 20];
        let data = user_data(&[0x08, 0x00], Some(&hdr), &[9]);
        assert_eq!(data.len(), 2 + 20 + 1);
        assert_eq!(data[2..22], hdr);
        assert_eq!(data[22], 9);
    }

    #[test_case("T", true)]
    #[test_case("F", false)]
    #[test_case("", false)]
    #[test_case("t", false)]
    #[test_case("TT", false)]
    #[test_case("true", false)]
    fn prepend_flag(flag: &str, expected: bool) {
        assert_eq!(parse_prepend_flag(flag), expected);
    }
}
