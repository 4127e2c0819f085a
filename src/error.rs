//! # Error Types
//!
//! Every failure the codec can produce, as a typed enum so callers can
//! distinguish truncation from corruption from range violations without
//! string matching.
//!
//! | Variant | Produced by |
//! |---------|-------------|
//! | `Truncated` | A buffer ended mid-element or mid-varint |
//! | `Corrupt` | An unknown element kind byte |
//! | `Utf8` | A text payload that is not valid UTF-8 |
//! | `FromHex` | Malformed input to [`Key::from_hex`](crate::Key::from_hex) |
//! | `OutOfRange` | A value the wire format cannot carry |
//! | `OutOfMemory` | Output buffer growth failure |
//!
//! A prefix mismatch during `unpack`/`unpacks`/`Key::from_raw` is *not* an
//! error: those return `None`, which callers use to filter foreign keys out
//! of a scan.

use thiserror::Error;

/// Failures produced while encoding or decoding keys.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KeyError {
    /// The input buffer ended before a complete element or varint was read.
    #[error("truncated input: needed {needed} more byte(s) but only {remaining} remain")]
    Truncated {
        /// Bytes the decoder still required.
        needed: usize,
        /// Bytes actually left in the buffer.
        remaining: usize,
    },

    /// An element kind byte outside the known set.
    #[error("unknown element kind 0x{kind:02x}")]
    Corrupt {
        /// The offending kind byte.
        kind: u8,
    },

    /// A text payload decoded to bytes that are not valid UTF-8.
    #[error("text payload is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    /// Malformed hexadecimal input.
    #[error("invalid hex input")]
    FromHex(#[from] hex::FromHexError),

    /// A value outside what the wire format can represent: an integer
    /// magnitude above 2^64-1, a UTC offset outside the quarter-hour
    /// window, or a timestamp whose shifted composite overflows 64 bits.
    #[error("{what} {value} is outside the encodable range")]
    OutOfRange {
        /// Which quantity was rejected.
        what: &'static str,
        /// The rejected value.
        value: i128,
    },

    /// Growing the output buffer failed.
    #[error("failed to reserve {needed} byte(s) of output")]
    OutOfMemory {
        /// Size of the reservation that failed.
        needed: usize,
    },
}

/// Crate-wide result alias.
pub type Result<T, E = KeyError> = std::result::Result<T, E>;
