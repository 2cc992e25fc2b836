use aes::Aes128;
use ctr::cipher::{generic_array::GenericArray, KeyIvInit, StreamCipher};

/// RFC 3686 counter mode: the last 32 bits of the counter block are the
/// big-endian block counter.
type Aes128Ctr = ctr::Ctr32BE<Aes128>;

pub const AES_BLOCK_LEN: usize = 16;

/// Encrypt or decrypt `buf` in place.
pub fn apply_keystream(key: &[u8; 16], counter_block: &[u8; AES_BLOCK_LEN], buf: &mut [u8]) {
    let mut cipher = Aes128Ctr::new(
        GenericArray::from_slice(key),
        GenericArray::from_slice(counter_block),
    );
    cipher.apply_keystream(buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 3686, test vector #1.
    #[test]
    fn rfc3686_single_block() {
        let key = [
            0xae, 0x68, 0x52, 0xf8, 0x12, 0x10, 0x67, 0xcc, 0x4b, 0xf7, 0xa5, 0x76, 0x55, 0x77,
            0xf3, 0x9e,
        ];
        let mut block = [0u8; 16];
        block[..4].copy_from_slice(&[0x00, 0x00, 0x00, 0x30]);
        block[15] = 1;

        let mut buf = *b"Single block msg";
        apply_keystream(&key, &block, &mut buf);
        assert_eq!(
            buf,
            [
                0xe4, 0x09, 0x5d, 0x4f, 0xb7, 0xa7, 0xb3, 0x79, 0x2d, 0x61, 0x75, 0xa3, 0x26,
                0x13, 0x11, 0xb8
            ]
        );

        apply_keystream(&key, &block, &mut buf);
        assert_eq!(&buf, b"Single block msg");
    }
}
