use aes_gcm::{
    aead::{generic_array::GenericArray, AeadInPlace},
    Aes128Gcm, KeyInit,
};

use crate::core::{Result, TransformError};

pub const GCM_KEY_LEN: usize = 16;
pub const GCM_NONCE_LEN: usize = 12;
pub const GCM_TAG_LEN: usize = 16;

/// Encrypt `buf` in place and return the authentication tag.
pub fn seal(
    key: &[u8; GCM_KEY_LEN],
    nonce: &[u8; GCM_NONCE_LEN],
    aad: &[u8],
    buf: &mut [u8],
) -> Result<[u8; GCM_TAG_LEN]> {
    let cipher = Aes128Gcm::new(GenericArray::from_slice(key));
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), aad, buf)
        .map_err(|_| TransformError::Crypto("GCM-AES-128 encryption"))?;

    let mut out = [0u8; GCM_TAG_LEN];
    out.copy_from_slice(&tag);
    Ok(out)
}

/// Verify `tag` and decrypt `buf` in place. Returns false if the tag does not
/// match; the content of `buf` must then be discarded.
pub fn open(
    key: &[u8; GCM_KEY_LEN],
    nonce: &[u8; GCM_NONCE_LEN],
    aad: &[u8],
    buf: &mut [u8],
    tag: &[u8; GCM_TAG_LEN],
) -> bool {
    let cipher = Aes128Gcm::new(GenericArray::from_slice(key));
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            aad,
            buf,
            GenericArray::from_slice(tag),
        )
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test cases 1 and 2 of the GCM specification.
    #[test]
    fn gcm_spec_vectors() {
        let key = [0u8; 16];
        let nonce = [0u8; 12];

        let tag = seal(&key, &nonce, &[], &mut []).unwrap();
        assert_eq!(
            tag,
            [
                0x58, 0xe2, 0xfc, 0xce, 0xfa, 0x7e, 0x30, 0x61, 0x36, 0x7f, 0x1d, 0x57, 0xa4,
                0xe7, 0x45, 0x5a
            ]
        );

        let mut buf = [0u8; 16];
        let tag = seal(&key, &nonce, &[], &mut buf).unwrap();
        assert_eq!(
            buf,
            [
                0x03, 0x88, 0xda, 0xce, 0x60, 0xb6, 0xa3, 0x92, 0xf3, 0x28, 0xc2, 0xb9, 0x71,
                0xb2, 0xfe, 0x78
            ]
        );
        assert_eq!(
            tag,
            [
                0xab, 0x6e, 0x47, 0xd4, 0x2c, 0xec, 0x13, 0xbd, 0xf5, 0x3a, 0x67, 0xb2, 0x12,
                0x57, 0xbd, 0xdf
            ]
        );

        assert!(open(&key, &nonce, &[], &mut buf, &tag));
        assert_eq!(buf, [0u8; 16]);
    }

    #[test]
    fn open_rejects_modified_aad() {
        let key = [7u8; 16];
        let nonce = [9u8; 12];
        let mut buf = *b"some user data";
        let tag = seal(&key, &nonce, b"aad", &mut buf).unwrap();

        let mut copy = buf;
        assert!(!open(&key, &nonce, b"aae", &mut copy, &tag));
        assert!(open(&key, &nonce, b"aad", &mut buf, &tag));
        assert_eq!(&buf, b"some user data");
    }
}
