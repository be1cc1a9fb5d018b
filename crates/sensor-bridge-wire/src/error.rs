//! Wire protocol errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("short read: wanted {wanted} bytes, {available} available")]
    ShortRead { wanted: usize, available: usize },

    #[error("frame declares {declared} bytes of samples, only {available} available")]
    TruncatedFrame { declared: usize, available: usize },

    #[error("bad handshake byte: {0:#04x}")]
    BadHandshake(u8),

    #[error("sample record for {sensor} must be {expected} bytes, got {actual}")]
    BadRecordSize {
        sensor: &'static str,
        expected: usize,
        actual: usize,
    },
}
