//! Error types for the Structured Bytes Stack.
//!
//! Strongly-typed errors for the two directions of the codec: `EncodeError`
//! for value-to-bytes failures and `DecodeError` for bytes-to-value failures.
//! Decoding works on untrusted input, so every decoder error carries enough
//! context (offset, tag, byte counts) to pinpoint the rejected input without
//! re-parsing it.

use thiserror::Error;

/// Errors that can occur while encoding a value into SBS bytes.
///
/// The closed [`Value`](crate::Value) sum type makes "unsupported type" and
/// in-variant shape violations compile-time impossibilities; everything
/// left is a resource limit or an unrepresentable length.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Composite recursion exceeded the nesting bound
    #[error("nesting depth exceeded {limit} composites")]
    DepthExceeded {
        /// The enforced bound
        limit: u32,
    },

    /// Growing the output buffer failed
    #[error("buffer allocation of {requested} additional bytes failed")]
    AllocationFailed {
        /// How many bytes the encoder asked for
        requested: usize,
    },

    /// A length fell outside what the widest length variant can express
    #[error("unrepresentable length: {detail}")]
    Unrepresentable {
        /// Description of the offending length
        detail: String,
    },
}

/// Errors that can occur while decoding SBS bytes into a value.
///
/// Decoding aborts on the first error; partially-built composites are
/// dropped. The decoder never reads past the end of the input, so a
/// `Truncated` error is the only possible outcome of a short buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The first byte is not a recognized protocol marker
    #[error("unknown protocol byte {byte:#04x}")]
    UnknownProtocol {
        /// The rejected first byte
        byte: u8,
    },

    /// A tag byte is outside the closed catalog
    #[error("unknown tag {tag:#04x} at offset {offset}")]
    UnknownTag {
        /// The rejected tag byte
        tag: u8,
        /// Byte offset of the tag within the decoded region
        offset: usize,
    },

    /// A read would run past the end of the buffer
    #[error("truncated input: need {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        /// Byte offset where the read started
        offset: usize,
        /// How many bytes the decoder needed
        needed: usize,
        /// How many bytes remained
        available: usize,
    },

    /// A payload failed a byte-level validity check (UTF-8, hex digits)
    #[error("invalid {what} payload at offset {offset}")]
    InvalidEncoding {
        /// Which payload kind failed validation
        what: &'static str,
        /// Byte offset of the payload
        offset: usize,
    },

    /// A domain constructor (UUID, Decimal, date/time) rejected its input
    #[error("cannot construct {what}: {detail}")]
    Construct {
        /// Which domain type rejected the input
        what: &'static str,
        /// The constructor's complaint
        detail: String,
    },

    /// Composite recursion exceeded the nesting bound
    ///
    /// Buffers produced by the encoder never hit this; it rejects crafted
    /// input that would otherwise exhaust the stack.
    #[error("nesting depth exceeded {limit} composites")]
    DepthExceeded {
        /// The enforced bound
        limit: u32,
    },
}

/// Convenience alias for encoder results.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Convenience alias for decoder results.
pub type DecodeResult<T> = Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = DecodeError::Truncated { offset: 3, needed: 2, available: 1 };
        assert_eq!(err.to_string(), "truncated input: need 2 bytes at offset 3, 1 available");

        let err = DecodeError::UnknownTag { tag: 0xAB, offset: 7 };
        assert_eq!(err.to_string(), "unknown tag 0xab at offset 7");

        let err = EncodeError::DepthExceeded { limit: 100 };
        assert_eq!(err.to_string(), "nesting depth exceeded 100 composites");
    }
}
