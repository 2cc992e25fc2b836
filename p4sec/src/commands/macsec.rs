//! # Macsec
//!
//! Runs the MACsec transforms on an Ethernet frame, the command playing the
//! role of the pipeline: it handles the Ethernet header and the SecTAG and
//! hands the payload to the transform.

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use serde::Serialize;

use p4sec::{
    core::keys::normalize_array,
    macsec::{
        frame::{IPV4_HDR_LEN, MAC_LEN, SECTAG_LEN},
        sectag::SecTagBuilder,
        MacsecCrypt, RawSecureChannel,
    },
};
use p4sec_pnet::{
    ethernet::{EtherTypes, EthernetPacket},
    macsec::{SecTagPacket, MACSEC_TCI_SC},
    Packet,
};

use super::packet::{serialize_hex, PacketArgs};
use crate::{
    cli::*,
    helpers::net::format_eth_addr,
    sa::{MacsecSa, SaConfig},
};

/// Destination and source addresses.
const ETH_ADDRS_LEN: usize = 2 * MAC_LEN;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MacsecAction {
    /// Protect an Ethernet frame.
    #[default]
    Protect,
    /// Validate a MACsec frame.
    Validate,
}

#[derive(Parser, Debug, Default)]
#[command(
    name = "macsec",
    about = "Protect or validate an Ethernet frame with MACsec.",
    long_about = "Protect or validate an Ethernet frame with MACsec.

GCM-AES-128, with a 16 bytes SecTAG carrying the SCI. Protection takes an Ethernet frame and outputs the MACsec frame, validation does the opposite. A JSON summary is printed on stdout."
)]
pub(crate) struct MacsecCmd {
    /// Transform to run
    #[arg(value_enum)]
    action: MacsecAction,
    #[command(flatten)]
    packet: PacketArgs,
    /// Hand the IPv4 header over to the transform separately from the rest of the payload
    #[arg(long)]
    include_ipv4: bool,
}

/// Result of a MACsec transform, as printed.
#[derive(Debug, Default, Serialize)]
pub(crate) struct MacsecSummary {
    pub(crate) action: &'static str,
    pub(crate) src: String,
    pub(crate) dst: String,
    pub(crate) sci: String,
    pub(crate) pn: u32,
    pub(crate) an: u8,
    /// Validation result, when validating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) valid: Option<bool>,
    /// Protected EtherType, as a hex string.
    pub(crate) ethertype: String,
    #[serde(serialize_with = "serialize_hex")]
    pub(crate) packet: Option<Vec<u8>>,
}

impl SubCommandParserRunner for MacsecCmd {
    fn run(&mut self, _: &MainConfig) -> Result<()> {
        let config = SaConfig::load(&self.packet.sa)?;
        let sa = config.macsec()?;
        let frame = self.packet.read()?;

        let summary = match self.action {
            MacsecAction::Protect => protect(sa, &frame, self.include_ipv4)?,
            MacsecAction::Validate => validate(sa, &frame)?,
        };
        match &summary.packet {
            Some(packet) => {
                self.packet.write(packet)?;
                info!("{} bytes frame processed", packet.len());
            }
            None => warn!("Frame dropped"),
        }

        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }
}

fn mac(raw: &[u8]) -> [u8; MAC_LEN] {
    let mut mac = [0u8; MAC_LEN];
    mac.copy_from_slice(&raw[..MAC_LEN]);
    mac
}

pub(crate) fn protect(sa: &MacsecSa, frame: &[u8], include_ipv4: bool) -> Result<MacsecSummary> {
    let eth = match EthernetPacket::new(frame) {
        Some(eth) => eth,
        None => bail!("Frame too short to hold an Ethernet header ({} bytes)", frame.len()),
    };
    let dst = mac(frame);
    let src = mac(&frame[MAC_LEN..]);
    let ethertype = eth.get_ethertype();
    if ethertype == EtherTypes::Macsec {
        bail!("Frame is already protected");
    }

    let payload = eth.payload();
    let (flag, ipv4_hdr, payload) = match include_ipv4 {
        true => {
            if ethertype != EtherTypes::Ipv4 || payload.len() < IPV4_HDR_LEN {
                bail!("No IPv4 header to hand over");
            }
            ("T", &payload[..IPV4_HDR_LEN], &payload[IPV4_HDR_LEN..])
        }
        false => ("F", &[][..], payload),
    };

    // The channel parameters must match the SecTAG put on the wire, the
    // receiver only knows about the latter.
    let (sectag, sci, pn, an) = match &sa.sectag {
        Some(sectag) => {
            let tag = match SecTagPacket::new(sectag) {
                Some(tag)
                    if sectag.len() == SECTAG_LEN
                        && tag.get_ethertype() == EtherTypes::Macsec
                        && tag.get_tci() & MACSEC_TCI_SC != 0 =>
                {
                    tag
                }
                _ => bail!("Configured SecTAG must be a {SECTAG_LEN} bytes MACsec tag carrying the SCI"),
            };
            if tag.get_packet_number() != sa.pn || tag.get_sci() != sa.sci(&src) {
                debug!("Using the PN and SCI of the configured SecTAG");
            }
            (
                sectag.clone(),
                tag.get_sci(),
                tag.get_packet_number(),
                tag.get_association_number(),
            )
        }
        None => {
            let sci = sa.sci(&src);
            let sectag = SecTagBuilder::new(normalize_array(&sci), sa.pn)
                .association_number(sa.an)
                .secure_data_len(frame.len() - ETH_ADDRS_LEN)
                .build()?
                .to_vec();
            (sectag, sci, sa.pn, sa.an)
        }
    };

    let raw_pn = pn.to_be_bytes();
    let channel = RawSecureChannel {
        sak: &sa.sak,
        sci: &sci,
        pn: &raw_pn,
        src_mac: &src,
        dst_mac: &dst,
        sectag: &sectag,
    };
    let mut data = payload.to_vec();
    MacsecCrypt::new().protect(
        &mut data,
        &channel,
        &ethertype.0.to_be_bytes(),
        flag,
        ipv4_hdr,
    )?;

    let mut out = frame[..ETH_ADDRS_LEN].to_vec();
    out.extend_from_slice(&sectag);
    out.extend_from_slice(&data);

    Ok(MacsecSummary {
        action: "protect",
        src: format_eth_addr(&src)?,
        dst: format_eth_addr(&dst)?,
        sci: hex::encode(&sci),
        pn,
        an,
        ethertype: hex::encode(ethertype.0.to_be_bytes()),
        packet: Some(out),
        ..Default::default()
    })
}

pub(crate) fn validate(sa: &MacsecSa, frame: &[u8]) -> Result<MacsecSummary> {
    if frame.len() < ETH_ADDRS_LEN + SECTAG_LEN {
        bail!("Frame too short to hold a SecTAG ({} bytes)", frame.len());
    }
    let sectag = match SecTagPacket::new(&frame[ETH_ADDRS_LEN..]) {
        Some(sectag) if sectag.get_ethertype() == EtherTypes::Macsec => sectag,
        _ => bail!("Not a MACsec frame"),
    };
    if sectag.get_tci() & MACSEC_TCI_SC == 0 {
        bail!("SecTAG without SCI are not supported");
    }

    let dst = mac(frame);
    let src = mac(&frame[MAC_LEN..]);
    let sci = sectag.get_sci();
    let pn = sectag.get_packet_number();
    if sci != sa.sci(&src) {
        warn!("SCI {} does not match the secure association", hex::encode(&sci));
    }
    if pn < sa.pn {
        debug!("PN {pn} is below the lowest acceptable one ({})", sa.pn);
    }

    let raw_pn = pn.to_be_bytes();
    let channel = RawSecureChannel {
        sak: &sa.sak,
        sci: &sci,
        pn: &raw_pn,
        src_mac: &src,
        dst_mac: &dst,
        sectag: &frame[ETH_ADDRS_LEN..ETH_ADDRS_LEN + SECTAG_LEN],
    };
    let mut data = frame[ETH_ADDRS_LEN + SECTAG_LEN..].to_vec();
    let validation = MacsecCrypt::new().validate(&mut data, &channel)?;

    let mut summary = MacsecSummary {
        action: "validate",
        src: format_eth_addr(&src)?,
        dst: format_eth_addr(&dst)?,
        sci: hex::encode(&sci),
        pn,
        an: sectag.get_association_number(),
        valid: Some(validation.valid),
        ethertype: validation.ethertype.clone(),
        ..Default::default()
    };
    // Act as the pipeline: invalid frames are dropped.
    if validation.valid {
        let mut out = frame[..ETH_ADDRS_LEN].to_vec();
        out.extend_from_slice(&hex::decode(&validation.ethertype)?);
        out.extend_from_slice(&data);
        summary.packet = Some(out);
    }
    Ok(summary)
}
