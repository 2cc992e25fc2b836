use pnet_macros::packet;
use pnet_macros_support::types::*;

use crate::ip::IpNextHeaderProtocol;

/// IP Encapsulating Security Payload
///
/// See [RFC 4303](https://datatracker.ietf.org/doc/html/rfc4303)
///
/// ESP header:
/// ```text
///    0                   1                   2                   3
///    0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+ ----
///   |               Security Parameters Index (SPI)                 | ^Int.
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+ |Cov-
///   |                      Sequence Number                          | |ered
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+ | ----
///   |                    Payload Data* (variable)                   | |   ^
///   ~                                                               ~ |   |
///   |                                                               | |Conf.
///   +               +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+ |Cov-
///   |               |     Padding (0-255 bytes)                     | |ered*
///   +-+-+-+-+-+-+-+-+               +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+ |   |
///   |                               |  Pad Length   | Next Header   | v   v
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+ ------
///   |         Integrity Check Value-ICV   (variable)                |
///   ~                                                               ~
///   |                                                               |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[packet]
pub struct Esp {
    pub spi: u32be,
    pub sequence_number: u32be,
    #[payload]
    pub payload: Vec<u8>,
}

/// Length of the fixed ESP header (SPI + sequence number).
pub const ESP_HEADER_LEN: usize = 8;

/// ESP trailer, i.e. the two bytes closing the encrypted region.
///
/// The padding preceding it is not part of this view: its length is only
/// known once the trailer itself has been read.
#[packet]
pub struct EspTrailer {
    pub pad_length: u8,
    #[construct_with(u8)]
    pub next_header: IpNextHeaderProtocol,
    #[payload]
    pub payload: Vec<u8>,
}

/// Length of the ESP trailer (pad length + next header).
pub const ESP_TRAILER_LEN: usize = 2;
