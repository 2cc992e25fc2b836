use pnet_macros::packet;
use pnet_macros_support::types::*;

use crate::ethernet::EtherType;

/// MACsec security tag, including the leading MACsec EtherType.
///
/// See IEEE 802.1AE, section 9.
///
/// ```text
///    0                   1                   2                   3
///    0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///   |       MACsec EtherType        |  TCI      |AN |Rsv|    SL     |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///   |                         Packet Number                         |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///   |              Secure Channel Identifier (optional)             |
///   +                                                               +
///   |                                                               |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[packet]
pub struct SecTag {
    #[construct_with(u16)]
    pub ethertype: EtherType,
    pub tci: u6,
    pub association_number: u2,
    pub reserved0: u2,
    pub short_length: u6,
    pub packet_number: u32be,
    #[length_fn = "sci_len"]
    pub sci: Vec<u8>,
    #[payload]
    pub payload: Vec<u8>,
}

fn sci_len(sectag: &SecTagPacket) -> usize {
    if sectag.get_tci() & MACSEC_TCI_SC != 0 {
        return MACSEC_SCI_LEN;
    }
    0
}

pub const MACSEC_TCI_V: u6 = 1 << 5;
pub const MACSEC_TCI_ES: u6 = 1 << 4;
pub const MACSEC_TCI_SC: u6 = 1 << 3;
pub const MACSEC_TCI_SCB: u6 = 1 << 2;
pub const MACSEC_TCI_E: u6 = 1 << 1;
pub const MACSEC_TCI_C: u6 = 1 << 0;

pub const MACSEC_SCI_LEN: usize = 8;
/// SecTAG length when the SCI is present.
pub const MACSEC_SECTAG_LEN: usize = 16;
/// Short length is only used for frames whose secure data is below this.
pub const MACSEC_SHORT_LEN_MAX: usize = 48;
