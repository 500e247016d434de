//! Error types for wire encoding and decoding

use thiserror::Error;

/// Result type for wire operations
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors that can occur while encoding or decoding graph and result buffers
#[derive(Error, Debug)]
pub enum WireError {
    /// Binary (bincode) payload could not be encoded or decoded
    #[error("Binary serialization error: {0}")]
    Binary(#[from] bincode::Error),

    /// JSON payload could not be encoded or decoded
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Buffer does not start with the expected frame magic
    #[error("Bad frame magic: expected {expected:?}, found {found:?}")]
    BadMagic {
        expected: [u8; 4],
        found: [u8; 4],
    },

    /// Frame was written by an incompatible format version
    #[error("Unsupported format version {0}")]
    UnsupportedVersion(u16),

    /// Buffer is shorter than the frame header
    #[error("Buffer truncated: {len} bytes, header needs {needed}")]
    Truncated {
        len: usize,
        needed: usize,
    },

    /// Record content violates the format (e.g. payload length vs. shape)
    #[error("Invalid record: {0}")]
    Invalid(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
