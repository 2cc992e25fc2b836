pub use pnet_packet::ethernet::*;

#[allow(non_snake_case, non_upper_case_globals)]
pub mod EtherTypes {
    use super::EtherType;
    pub use pnet_packet::ethernet::EtherTypes::*;

    /// MACsec (IEEE 802.1AE).
    pub const Macsec: EtherType = EtherType(0x88e5);
}
