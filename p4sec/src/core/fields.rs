//! # Header fields
//!
//! The host pipeline parses headers into named fields and exposes them
//! through byte-level accessors. Some fields are narrower than a byte
//! (IPv4 version, IHL, flags, fragment offset), so rebuilding a header from
//! its fields, or splitting one back, needs bit-level packing. Layouts are
//! described as static tables of (name, bit offset, bit width) and packed or
//! unpacked generically.
//!
//! A field value is always a right-aligned big-endian byte string of
//! exactly `ceil(bit_width / 8)` bytes.

use super::error::{need, Result, TransformError};

/// A single field of a header layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub name: &'static str,
    /// Offset in bits from the start of the header, MSB first.
    pub bit_offset: usize,
    pub bit_width: usize,
}

impl BitField {
    const fn new(name: &'static str, bit_offset: usize, bit_width: usize) -> Self {
        Self {
            name,
            bit_offset,
            bit_width,
        }
    }

    /// Width of the field value as exchanged with the host.
    pub fn byte_width(&self) -> usize {
        self.bit_width.div_ceil(8)
    }
}

/// Bit-level layout of a header.
#[derive(Debug, PartialEq, Eq)]
pub struct HeaderLayout {
    pub name: &'static str,
    pub fields: &'static [BitField],
}

/// IPv4 header without options, following RFC 791. The diffserv byte is
/// kept whole, as the pipeline parses it.
pub static IPV4: HeaderLayout = HeaderLayout {
    name: "ipv4",
    fields: &[
        BitField::new("version", 0, 4),
        BitField::new("ihl", 4, 4),
        BitField::new("diffserv", 8, 8),
        BitField::new("totalLen", 16, 16),
        BitField::new("identification", 32, 16),
        BitField::new("flags", 48, 3),
        BitField::new("fragOffset", 51, 13),
        BitField::new("ttl", 64, 8),
        BitField::new("protocol", 72, 8),
        BitField::new("hdrChecksum", 80, 16),
        BitField::new("srcAddr", 96, 32),
        BitField::new("dstAddr", 128, 32),
    ],
};

/// ESP header.
pub static ESP: HeaderLayout = HeaderLayout {
    name: "esp",
    fields: &[BitField::new("spi", 0, 32), BitField::new("seqNo", 32, 32)],
};

/// Subset of the pipeline standard metadata the transforms write to.
pub static STANDARD_METADATA: HeaderLayout = HeaderLayout {
    name: "standard_metadata",
    fields: &[
        BitField::new("egress_spec", 0, 9),
        BitField::new("mcast_grp", 9, 16),
    ],
};

/// Egress port value telling the pipeline to drop the packet.
pub const DROP_PORT: u64 = 0x1ff;

impl HeaderLayout {
    /// Length of the packed header in bytes.
    pub fn len(&self) -> usize {
        self.fields
            .iter()
            .map(|f| f.bit_offset + f.bit_width)
            .max()
            .unwrap_or(0)
            .div_ceil(8)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn field(&self, name: &str) -> Option<&BitField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Build the wire representation of the header from its fields.
    pub fn pack(&self, fields: &dyn HeaderFields) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.len()];

        for f in self.fields.iter() {
            let value = fields.get(f.name)?;
            check_width(f, value)?;
            write_bits(&mut out, f.bit_offset, f.bit_width, be_to_u64(value));
        }

        Ok(out)
    }

    /// Split the wire representation of a header into its fields. Only the
    /// first `len()` bytes of `raw` are used.
    pub fn unpack(&self, raw: &[u8], fields: &mut dyn HeaderFields) -> Result<()> {
        need(self.name, self.len(), raw.len())?;

        for f in self.fields.iter() {
            let value = read_bits(raw, f.bit_offset, f.bit_width).to_be_bytes();
            fields.set(f.name, &value[8 - f.byte_width()..])?;
        }

        Ok(())
    }
}

/// Access to parsed header fields, as provided by the host pipeline.
pub trait HeaderFields {
    /// Get the raw value of a field.
    fn get(&self, name: &str) -> Result<&[u8]>;
    /// Set the raw value of a field. `value` must have the field's width.
    fn set(&mut self, name: &str, value: &[u8]) -> Result<()>;

    /// Get a field value as an integer.
    fn get_uint(&self, name: &str) -> Result<u64> {
        Ok(be_to_u64(self.get(name)?))
    }

    /// Set a field from an integer, using the width of the current value.
    fn set_uint(&mut self, name: &str, value: u64) -> Result<()> {
        let width = self.get(name)?.len();
        if width < 8 && value >> (width * 8) != 0 {
            return Err(TransformError::FieldOverflow {
                name: name.to_string(),
                bits: width * 8,
            });
        }
        self.set(name, &value.to_be_bytes()[8 - width..])
    }
}

/// Field storage bound to a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFieldSet {
    layout: &'static HeaderLayout,
    values: Vec<Vec<u8>>,
}

impl HeaderFieldSet {
    /// Create a set with all fields zeroed.
    pub fn new(layout: &'static HeaderLayout) -> Self {
        Self {
            layout,
            values: layout
                .fields
                .iter()
                .map(|f| vec![0u8; f.byte_width()])
                .collect(),
        }
    }

    /// Create a set from a packed header.
    pub fn from_bytes(layout: &'static HeaderLayout, raw: &[u8]) -> Result<Self> {
        let mut set = Self::new(layout);
        layout.unpack(raw, &mut set)?;
        Ok(set)
    }

    pub fn layout(&self) -> &'static HeaderLayout {
        self.layout
    }

    /// Iterate over (name, value) pairs in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[u8])> {
        self.layout
            .fields
            .iter()
            .zip(self.values.iter())
            .map(|(f, v)| (f.name, v.as_slice()))
    }

    fn index(&self, name: &str) -> Result<usize> {
        self.layout
            .fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| TransformError::UnknownField(format!("{}.{name}", self.layout.name)))
    }
}

impl HeaderFields for HeaderFieldSet {
    fn get(&self, name: &str) -> Result<&[u8]> {
        Ok(&self.values[self.index(name)?])
    }

    fn set(&mut self, name: &str, value: &[u8]) -> Result<()> {
        let idx = self.index(name)?;
        check_width(&self.layout.fields[idx], value)?;
        self.values[idx] = value.to_vec();
        Ok(())
    }
}

/// Flag a packet for dropping: invalid egress port and no multicast group.
pub fn mark_drop(metadata: &mut dyn HeaderFields) -> Result<()> {
    metadata.set_uint("egress_spec", DROP_PORT)?;
    metadata.set_uint("mcast_grp", 0)
}

fn check_width(f: &BitField, value: &[u8]) -> Result<()> {
    if value.len() != f.byte_width() {
        return Err(TransformError::FieldWidth {
            name: f.name.to_string(),
            expected: f.byte_width(),
            got: value.len(),
        });
    }
    if f.bit_width < 64 && be_to_u64(value) >> f.bit_width != 0 {
        return Err(TransformError::FieldOverflow {
            name: f.name.to_string(),
            bits: f.bit_width,
        });
    }
    Ok(())
}

fn be_to_u64(value: &[u8]) -> u64 {
    value.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)
}

fn read_bits(buf: &[u8], offset: usize, width: usize) -> u64 {
    (offset..offset + width).fold(0u64, |acc, bit| {
        (acc << 1) | ((buf[bit / 8] >> (7 - bit % 8)) & 1) as u64
    })
}

fn write_bits(buf: &mut [u8], offset: usize, width: usize, value: u64) {
    for i in 0..width {
        let bit = offset + i;
        let mask = 1u8 << (7 - bit % 8);
        if (value >> (width - 1 - i)) & 1 == 1 {
            buf[bit / 8] |= mask;
        } else {
            buf[bit / 8] &= !mask;
        }
    }
}

#[cfg(test)]
mod tests {
    use p4sec_pnet::ipv4::Ipv4Packet;
    use test_case::test_case;

    use super::*;

    fn ipv4_fields() -> HeaderFieldSet {
        let mut f = HeaderFieldSet::new(&IPV4);
        f.set_uint("version", 4).unwrap();
        f.set_uint("ihl", 5).unwrap();
        f.set_uint("diffserv", 0xb8).unwrap();
        f.set_uint("totalLen", 84).unwrap();
        f.set_uint("identification", 0xbeef).unwrap();
        f.set_uint("flags", 0b010).unwrap();
        f.set_uint("fragOffset", 0x1fff).unwrap();
        f.set_uint("ttl", 64).unwrap();
        f.set_uint("protocol", 1).unwrap();
        f.set_uint("hdrChecksum", 0x1234).unwrap();
        f.set("srcAddr", &[10, 0, 0, 1]).unwrap();
        f.set("dstAddr", &[10, 0, 1, 2]).unwrap();
        f
    }

    #[test]
    fn layout_lengths() {
        assert_eq!(IPV4.len(), 20);
        assert_eq!(ESP.len(), 8);
        assert_eq!(IPV4.field("fragOffset").unwrap().byte_width(), 2);
        assert_eq!(IPV4.field("flags").unwrap().byte_width(), 1);
    }

    #[test]
    fn ipv4_bitfields_roundtrip() {
        let fields = ipv4_fields();
        let raw = IPV4.pack(&fields).unwrap();

        assert_eq!(raw[0], 0x45);
        assert_eq!(&raw[6..8], &[0x5f, 0xff]);

        let back = HeaderFieldSet::from_bytes(&IPV4, &raw).unwrap();
        assert_eq!(back, fields);
        assert_eq!(back.get_uint("version").unwrap(), 4);
        assert_eq!(back.get_uint("ihl").unwrap(), 5);
        assert_eq!(back.get_uint("flags").unwrap(), 0b010);
        assert_eq!(back.get_uint("fragOffset").unwrap(), 0x1fff);
    }

    #[test]
    fn ipv4_packed_parses_as_ipv4() {
        let raw = IPV4.pack(&ipv4_fields()).unwrap();
        let ip = Ipv4Packet::new(&raw).unwrap();

        assert_eq!(ip.get_version(), 4);
        assert_eq!(ip.get_header_length(), 5);
        assert_eq!(ip.get_dscp(), 0xb8 >> 2);
        assert_eq!(ip.get_total_length(), 84);
        assert_eq!(ip.get_identification(), 0xbeef);
        assert_eq!(ip.get_flags(), 0b010);
        assert_eq!(ip.get_fragment_offset(), 0x1fff);
        assert_eq!(ip.get_ttl(), 64);
        assert_eq!(ip.get_checksum(), 0x1234);
        assert_eq!(ip.get_source().octets(), [10, 0, 0, 1]);
        assert_eq!(ip.get_destination().octets(), [10, 0, 1, 2]);
    }

    #[test]
    fn unpack_all_zero_header() {
        let fields = HeaderFieldSet::from_bytes(&IPV4, &[0u8; 20]).unwrap();
        assert!(fields.iter().all(|(_, v)| v.iter().all(|b| *b == 0)));
        assert_eq!(fields, HeaderFieldSet::new(&IPV4));
    }

    #[test]
    fn unpack_short_buffer() {
        let mut fields = HeaderFieldSet::new(&IPV4);
        let err = IPV4.unpack(&[0x45; 19], &mut fields).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test_case("version", &[0x10] ; "nibble overflow")]
    #[test_case("flags", &[0x08] ; "flags overflow")]
    #[test_case("fragOffset", &[0x20, 0x00] ; "offset overflow")]
    fn set_overflow(name: &str, value: &[u8]) {
        let mut fields = HeaderFieldSet::new(&IPV4);
        assert!(matches!(
            fields.set(name, value),
            Err(TransformError::FieldOverflow { .. })
        ));
    }

    #[test]
    fn set_bad_width_or_name() {
        let mut fields = HeaderFieldSet::new(&IPV4);
        assert!(matches!(
            fields.set("totalLen", &[1]),
            Err(TransformError::FieldWidth { expected: 2, got: 1, .. })
        ));
        assert!(matches!(
            fields.set("options", &[1]),
            Err(TransformError::UnknownField(_))
        ));
        assert!(fields.set_uint("ttl", 256).is_err());
    }

    #[test]
    fn drop_marking() {
        let mut meta = HeaderFieldSet::new(&STANDARD_METADATA);
        meta.set_uint("mcast_grp", 3).unwrap();
        mark_drop(&mut meta).unwrap();
        assert_eq!(meta.get("egress_spec").unwrap(), &[0x01, 0xff]);
        assert_eq!(meta.get_uint("mcast_grp").unwrap(), 0);
    }
}
