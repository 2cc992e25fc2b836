use hmac::{Hmac, Mac};
use md5::Md5;
use subtle::ConstantTimeEq;

use crate::core::{Result, TransformError};

type HmacMd5 = Hmac<Md5>;

/// HMAC-MD5-96 (RFC 2403): the HMAC output truncated to 12 bytes.
pub const ICV_LEN: usize = 12;

/// Compute the ICV over the concatenation of `parts`.
pub fn compute(key: &[u8], parts: &[&[u8]]) -> Result<[u8; ICV_LEN]> {
    let mut mac =
        HmacMd5::new_from_slice(key).map_err(|_| TransformError::Crypto("HMAC-MD5 key setup"))?;
    for part in parts {
        mac.update(part);
    }
    let tag = mac.finalize().into_bytes();

    let mut icv = [0u8; ICV_LEN];
    icv.copy_from_slice(&tag[..ICV_LEN]);
    Ok(icv)
}

/// Recompute the ICV and compare it with the received one in constant time.
pub fn verify(key: &[u8], parts: &[&[u8]], received: &[u8]) -> Result<bool> {
    let expected = compute(key, parts)?;
    Ok(expected[..].ct_eq(received).unwrap_u8() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 2202, test cases 1 and 2, truncated to 96 bits.
    #[test]
    fn rfc2202_vectors() {
        assert_eq!(
            compute(&[0x0b; 16], &[b"Hi There"]).unwrap(),
            [0x92, 0x94, 0x72, 0x7a, 0x36, 0x38, 0xbb, 0x1c, 0x13, 0xf4, 0x8e, 0xf8]
        );
        assert_eq!(
            compute(b"Jefe", &[b"what do ya ", b"want for nothing?"]).unwrap(),
            [0x75, 0x0c, 0x78, 0x3e, 0x6a, 0xb0, 0xb5, 0x03, 0xea, 0xa8, 0x6e, 0x31]
        );
    }

    #[test]
    fn verify_detects_changes() {
        let key = [0x42; 16];
        let icv = compute(&key, &[b"header", b"payload"]).unwrap();
        assert!(verify(&key, &[b"headerpayload"], &icv).unwrap());
        assert!(!verify(&key, &[b"headerpayloae"], &icv).unwrap());
        assert!(!verify(&key, &[b"headerpayload"], &icv[..11]).unwrap());

        let mut bad = icv;
        bad[11] ^= 0x01;
        assert!(!verify(&key, &[b"headerpayload"], &bad).unwrap());
    }
}
