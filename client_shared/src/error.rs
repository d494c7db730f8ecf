//! Error taxonomy for the protocol layer.
//!
//! Everything here is non-fatal to the session: a failed decode or a protocol
//! violation drops the offending packet and nothing else. Connection-level
//! failures are surfaced through the transport seam, not through these types.

use thiserror::Error;

/// Failure while reading or writing the binary wire format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The buffer ended before the field could be read.
    #[error("unexpected end of buffer: needed {needed} more bytes, {remaining} left")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// A length-prefixed string was not valid UTF-8.
    #[error("string field is not valid UTF-8")]
    BadUtf8,

    /// A float field decoded to NaN or infinity.
    #[error("non-finite float field")]
    NonFinite,

    /// An optional-field presence flag held a value other than 0 or 1.
    #[error("invalid presence flag {0:#04x}")]
    BadPresenceFlag(u8),

    /// An enum field decoded to an unknown discriminant.
    #[error("invalid {what} value {value}")]
    BadEnumValue { what: &'static str, value: u8 },

    /// The packet body decoded cleanly but left unread bytes behind.
    #[error("{0} trailing bytes after packet body")]
    TrailingBytes(usize),
}

/// Per-packet failure observed at the dispatch boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    /// Truncated or malformed payload.
    #[error("decode failed: {0}")]
    Decode(#[from] WireError),

    /// Well-formed packet missing a required identifier.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),
}
