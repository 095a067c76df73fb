//! Error types for racklink-core

/// Result type alias for racklink-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Packet is too short to be valid
    #[error("Packet too short: expected at least {expected} bytes, got {actual} bytes")]
    PacketTooShort {
        expected: usize,
        actual: usize,
    },

    /// First or last byte is not a framing marker
    #[error("Invalid framing: header=0x{header:02X}, tail=0x{tail:02X}")]
    InvalidFraming {
        header: u8,
        tail: u8,
    },

    /// Declared length does not match the bytes received
    #[error("Length mismatch: header declares {declared} bytes, packet carries {actual}")]
    LengthMismatch {
        declared: usize,
        actual: usize,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:02X}, received 0x{received:02X}")]
    ChecksumMismatch {
        expected: u8,
        received: u8,
    },

    /// Unescaped envelope lacks destination/command/subcommand
    #[error("Envelope too short: {0} bytes (min: 3)")]
    EnvelopeTooShort(usize),

    /// Escaped envelope does not fit in the length byte
    #[error("Envelope too large: {size} bytes escaped (max: {max} bytes)")]
    EnvelopeTooLarge {
        size: usize,
        max: usize,
    },

    /// Unknown command code
    #[error("Unknown command code: 0x{0:02X}")]
    UnknownCommand(u8),

    /// Unknown subcommand code
    #[error("Unknown subcommand code: 0x{0:02X}")]
    UnknownSubcommand(u8),

    /// Invalid session state
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),
}

impl Error {
    /// Check if the error means the received bytes were not a valid packet
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::PacketTooShort { .. }
                | Self::InvalidFraming { .. }
                | Self::LengthMismatch { .. }
                | Self::ChecksumMismatch { .. }
                | Self::EnvelopeTooShort(_)
        )
    }
}
