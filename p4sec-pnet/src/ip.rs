pub use pnet_packet::ip::*;

#[allow(non_snake_case, non_upper_case_globals)]
pub mod IpNextHeaderProtocols {
    use super::IpNextHeaderProtocol;
    pub use pnet_packet::ip::IpNextHeaderProtocols::*;

    /// IP-in-IP, as carried in the ESP trailer of a tunnel-mode packet.
    pub const IpIp: IpNextHeaderProtocol = IpNextHeaderProtocol(4);
}
