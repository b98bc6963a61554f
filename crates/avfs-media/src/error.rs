//! Error types for avfs-media.

use std::io;
use thiserror::Error;

/// Result type for avfs-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for avfs-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred while pulling media from a source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The clip cannot be presented as an AVI file.
    #[error("Unsupported clip: {0}")]
    Unsupported(String),

    /// A plan structure could not be allocated.
    #[error("Failed to allocate {bytes} bytes for {what}")]
    Allocation { what: &'static str, bytes: usize },

    /// The decode source failed to produce a frame or sample range.
    #[error("Decode failed: {0}")]
    Decode(String),

    /// A read extends past the end of the virtual file.
    #[error("Read of {len} bytes at offset {offset} exceeds file size {size}")]
    OutOfRange { offset: u64, len: u64, size: u64 },

    /// Malformed RIFF data.
    #[error("Invalid chunk: {0}")]
    InvalidChunk(String),

    /// Buffer too small for operation.
    #[error("Buffer underflow: need {need} bytes, have {have}")]
    BufferUnderflow { need: usize, have: usize },
}

impl Error {
    /// Create an unsupported clip error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an invalid chunk error.
    pub fn invalid_chunk(msg: impl Into<String>) -> Self {
        Self::InvalidChunk(msg.into())
    }
}
