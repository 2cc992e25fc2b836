//! # Errors
//!
//! Errors a transform can report to its host pipeline. Integrity and
//! authentication failures are not part of this taxonomy: they are
//! signaled through packet metadata (ESP) or a validity flag (MACsec) and
//! the pipeline decides what to do with the packet.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("malformed frame: {what} needs {needed} bytes, {available} available")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("malformed frame: pad length {pad_len} exceeds the {available} decrypted bytes")]
    BadPadding { pad_len: usize, available: usize },
    #[error("unknown header field ({0})")]
    UnknownField(String),
    #[error("header field {name} is {expected} bytes wide, got {got}")]
    FieldWidth {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("value does not fit in the {bits} bits of header field {name}")]
    FieldOverflow { name: String, bits: usize },
    #[error("{what}: expected {expected} bytes, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("cryptographic primitive failure: {0}")]
    Crypto(&'static str),
}

impl TransformError {
    /// Is the error caused by a frame that cannot be decoded? Such packets
    /// must be dropped.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            TransformError::Truncated { .. } | TransformError::BadPadding { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;

/// Ensure a buffer holds at least `needed` bytes.
pub(crate) fn need(what: &'static str, needed: usize, available: usize) -> Result<()> {
    if available < needed {
        return Err(TransformError::Truncated {
            what,
            needed,
            available,
        });
    }
    Ok(())
}
