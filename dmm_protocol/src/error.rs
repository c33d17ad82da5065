/*!
Error types for the multimeter protocol.
*/

use thiserror::Error;

/// Common result type used throughout the protocol library
pub type Result<T> = std::result::Result<T, DmmError>;

/// Failures surfaced by synchronization and reading
#[derive(Error, Debug)]
pub enum DmmError {
    /// Transport returned nothing within its timeout while synchronizing
    #[error("No data received from meter within timeout")]
    NoData,

    /// Sync byte carried position 0 or 15, which no frame slot uses
    #[error("Invalid sync marker in byte {byte:#04x}")]
    InvalidSyncMarker { byte: u8 },

    /// Retry budget exhausted without an aligned frame
    #[error("No valid frame after {attempts} read attempts")]
    ReadFailure { attempts: usize },

    /// I/O errors from the underlying transport
    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Problems with a single assumed-aligned frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Invalid frame length: expected 14 bytes, got {0}")]
    InvalidLength(usize),

    /// Byte at `position` (1-based) carried `marker` in its high nibble
    #[error("Misaligned frame: byte {position} has position marker {marker}")]
    Misaligned { position: usize, marker: u8 },
}
