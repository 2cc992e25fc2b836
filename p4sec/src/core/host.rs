//! # Host
//!
//! Capabilities the transforms need from the packet-processing pipeline
//! invoking them. The pipeline owns the packet: a transform reads the
//! current payload and replaces it as a whole, it never resizes it in place.

/// Payload region of the packet being processed.
pub trait PacketBuffer {
    /// Current payload.
    fn data(&self) -> &[u8];
    /// Remove the whole payload and prepend `data` in its place.
    fn replace(&mut self, data: Vec<u8>);
}

impl PacketBuffer for Vec<u8> {
    fn data(&self) -> &[u8] {
        self.as_slice()
    }

    fn replace(&mut self, data: Vec<u8>) {
        *self = data;
    }
}
