//! # Esp
//!
//! Runs the ESP transforms on a packet, the command playing the role of the
//! pipeline: it parses the headers into field sets, calls the transform and
//! rebuilds the packet.

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use serde::Serialize;

use p4sec::{
    core::{HeaderFieldSet, HeaderFields, DROP_PORT, ESP, IPV4, STANDARD_METADATA},
    esp::{
        frame::{ESP_OUTER_OVERHEAD, IPV4_HEADER_LEN},
        EspCrypt, IcvStatus,
    },
};
use p4sec_pnet::{
    ip::IpNextHeaderProtocols,
    ipv4::{checksum, Ipv4Packet},
};

use super::packet::{serialize_hex, PacketArgs};
use crate::{
    cli::*,
    helpers::net::format_ipv4_addr,
    sa::{EspSa, SaConfig},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EspAction {
    /// Encapsulate an IPv4 packet.
    #[default]
    Encrypt,
    /// Decapsulate an ESP packet.
    Decrypt,
}

#[derive(Parser, Debug, Default)]
#[command(
    name = "esp",
    about = "Encrypt or decrypt a packet with IPsec ESP.",
    long_about = "Encrypt or decrypt a packet with IPsec ESP.

Tunnel mode, AES-128-CTR and HMAC-MD5-96. Encryption takes an IPv4 packet and outputs the ESP packet, the inner header being reused as the outer one. Decryption does the opposite. A JSON summary is printed on stdout."
)]
pub(crate) struct EspCmd {
    /// Transform to run
    #[arg(value_enum)]
    action: EspAction,
    #[command(flatten)]
    packet: PacketArgs,
}

/// Result of an ESP transform, as printed.
#[derive(Debug, Default, Serialize)]
pub(crate) struct EspSummary {
    pub(crate) action: &'static str,
    pub(crate) spi: u32,
    pub(crate) seq: u32,
    pub(crate) src: String,
    pub(crate) dst: String,
    /// ICV check result, when decrypting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) icv: Option<&'static str>,
    pub(crate) dropped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    #[serde(serialize_with = "serialize_hex")]
    pub(crate) packet: Option<Vec<u8>>,
}

impl SubCommandParserRunner for EspCmd {
    fn run(&mut self, _: &MainConfig) -> Result<()> {
        let config = SaConfig::load(&self.packet.sa)?;
        let sa = config.esp()?;
        let packet = self.packet.read()?;

        let summary = match self.action {
            EspAction::Encrypt => encrypt(sa, &packet)?,
            EspAction::Decrypt => decrypt(sa, &packet)?,
        };
        match &summary.packet {
            Some(packet) => {
                self.packet.write(packet)?;
                info!("{} bytes packet processed", packet.len());
            }
            None => warn!("Packet dropped"),
        }

        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }
}

/// Parse the IPv4 header at the start of the packet.
fn parse_ipv4(packet: &[u8]) -> Result<HeaderFieldSet> {
    if packet.len() < IPV4_HEADER_LEN {
        bail!("Packet too short to hold an IPv4 header ({} bytes)", packet.len());
    }

    let ipv4 = HeaderFieldSet::from_bytes(&IPV4, packet)?;
    if ipv4.get_uint("version")? != 4 {
        bail!("Not an IPv4 packet");
    }
    if ipv4.get_uint("ihl")? != 5 {
        bail!("IPv4 options are not supported");
    }
    Ok(ipv4)
}

/// Serialize an IPv4 header, with a fresh checksum.
fn build_ipv4(ipv4: &mut HeaderFieldSet) -> Result<Vec<u8>> {
    ipv4.set_uint("hdrChecksum", 0)?;
    let raw = IPV4.pack(ipv4)?;
    let csum = match Ipv4Packet::new(&raw) {
        Some(header) => checksum(&header),
        None => bail!("Could not build the IPv4 header"),
    };
    ipv4.set_uint("hdrChecksum", csum as u64)?;
    Ok(IPV4.pack(ipv4)?)
}

fn addresses(ipv4: &HeaderFieldSet) -> Result<(String, String)> {
    Ok((
        format_ipv4_addr(ipv4.get_uint("srcAddr")? as u32)?,
        format_ipv4_addr(ipv4.get_uint("dstAddr")? as u32)?,
    ))
}

pub(crate) fn encrypt(sa: &EspSa, packet: &[u8]) -> Result<EspSummary> {
    let mut ipv4 = parse_ipv4(packet)?;
    let mut esp = HeaderFieldSet::new(&ESP);
    esp.set_uint("spi", sa.spi as u64)?;
    esp.set_uint("seqNo", sa.seq as u64)?;

    let mut payload = packet[IPV4_HEADER_LEN..].to_vec();
    EspCrypt::new().encrypt_aes_ctr(
        &mut payload,
        &mut ipv4,
        &esp,
        &sa.cipher_key,
        &sa.auth_key,
    )?;

    ipv4.set_uint("protocol", IpNextHeaderProtocols::Esp.0 as u64)?;
    let mut out = build_ipv4(&mut ipv4)?;
    out.extend_from_slice(&ESP.pack(&esp)?);
    out.extend_from_slice(&payload);

    let (src, dst) = addresses(&ipv4)?;
    Ok(EspSummary {
        action: "encrypt",
        spi: sa.spi,
        seq: sa.seq,
        src,
        dst,
        packet: Some(out),
        ..Default::default()
    })
}

pub(crate) fn decrypt(sa: &EspSa, packet: &[u8]) -> Result<EspSummary> {
    let outer = parse_ipv4(packet)?;
    if outer.get_uint("protocol")? != IpNextHeaderProtocols::Esp.0 as u64 {
        bail!("Not an ESP packet");
    }
    if packet.len() < ESP_OUTER_OVERHEAD {
        bail!("Packet too short to hold an ESP header ({} bytes)", packet.len());
    }
    let esp = HeaderFieldSet::from_bytes(&ESP, &packet[IPV4_HEADER_LEN..])?;
    let spi = esp.get_uint("spi")? as u32;
    if spi != sa.spi {
        warn!("SPI {spi:#x} does not match the security association ({:#x})", sa.spi);
    }

    let mut summary = EspSummary {
        action: "decrypt",
        spi,
        seq: esp.get_uint("seqNo")? as u32,
        ..Default::default()
    };
    (summary.src, summary.dst) = addresses(&outer)?;

    let mut ipv4 = HeaderFieldSet::new(&IPV4);
    let mut metadata = HeaderFieldSet::new(&STANDARD_METADATA);
    let mut payload = packet[ESP_OUTER_OVERHEAD..].to_vec();
    match EspCrypt::new().decrypt_aes_ctr(
        &mut payload,
        &mut ipv4,
        &esp,
        &mut metadata,
        &sa.cipher_key,
        &sa.auth_key,
    ) {
        Ok(status) => {
            summary.icv = Some(match status {
                IcvStatus::Valid => "valid",
                IcvStatus::Mismatch => "mismatch",
            })
        }
        Err(e) if e.is_malformed() => summary.error = Some(e.to_string()),
        Err(e) => return Err(e.into()),
    }

    // Act as the pipeline: honor the drop request.
    summary.dropped = metadata.get_uint("egress_spec")? == DROP_PORT;
    if !summary.dropped {
        let mut out = IPV4.pack(&ipv4)?;
        out.extend_from_slice(&payload);
        summary.packet = Some(out);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sa() -> EspSa {
        EspSa {
            spi: 0x1000,
            seq: 7,
            cipher_key: vec![b'A'; 20],
            auth_key: vec![b'B'; 16],
        }
    }

    fn inner_packet() -> Vec<u8> {
        let mut packet = vec![
            0x45, 0x00, 0x00, 0x24, 0x12, 0x34, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 10, 0, 1, 1,
            10, 0, 2, 1,
        ];
        packet.extend_from_slice(&[0x30; 16]);
        packet
    }

    #[test]
    fn tunnel_roundtrip() {
        let summary = encrypt(&sa(), &inner_packet()).unwrap();
        assert_eq!(summary.src, "10.0.1.1");
        assert_eq!(summary.dst, "10.0.2.1");
        let outer = summary.packet.unwrap();

        let header = Ipv4Packet::new(&outer).unwrap();
        assert_eq!(header.get_next_level_protocol(), IpNextHeaderProtocols::Esp);
        assert_eq!(header.get_total_length() as usize, outer.len());
        assert_eq!(header.get_checksum(), checksum(&header));
        assert_eq!(outer[20..24], [0, 0, 0x10, 0]);
        assert_eq!(outer[24..28], [0, 0, 0, 7]);

        let summary = decrypt(&sa(), &outer).unwrap();
        assert_eq!(summary.icv, Some("valid"));
        assert!(!summary.dropped);
        assert_eq!(summary.seq, 7);
        assert_eq!(summary.packet.unwrap(), inner_packet());
    }

    #[test]
    fn tampered_packet_is_dropped() {
        let mut outer = encrypt(&sa(), &inner_packet()).unwrap().packet.unwrap();
        let len = outer.len();
        outer[len - 1] ^= 1;

        let summary = decrypt(&sa(), &outer).unwrap();
        assert_eq!(summary.icv, Some("mismatch"));
        assert!(summary.dropped);
        assert!(summary.packet.is_none());
    }

    #[test]
    fn truncated_packet_is_dropped() {
        let outer = encrypt(&sa(), &inner_packet()).unwrap().packet.unwrap();

        let summary = decrypt(&sa(), &outer[..ESP_OUTER_OVERHEAD + 10]).unwrap();
        assert!(summary.dropped);
        assert!(summary.icv.is_none());
        assert!(summary.error.is_some());
    }

    #[test]
    fn invalid_input() {
        assert!(encrypt(&sa(), &inner_packet()[..19]).is_err());
        // Not ESP.
        assert!(decrypt(&sa(), &inner_packet()).is_err());

        let mut options = inner_packet();
        options[0] = 0x46;
        assert!(encrypt(&sa(), &options).is_err());
    }

    #[test]
    fn summary_json() {
        let summary = decrypt(&sa(), &encrypt(&sa(), &inner_packet()).unwrap().packet.unwrap())
            .unwrap();
        let json: serde_json::Value = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["action"], "decrypt");
        assert_eq!(json["spi"], 0x1000);
        assert_eq!(json["icv"], "valid");
        assert_eq!(json["packet"], hex::encode(inner_packet()));
        assert!(json.get("error").is_none());
    }
}
