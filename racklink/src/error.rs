//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] racklink_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] racklink_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] racklink_types::Error),

    #[error("Device not connected")]
    NotConnected,

    /// Device explicitly rejected the request
    #[error("Command 0x{command:02X} rejected by device (NACK 0x{code:02X})")]
    Nack {
        command: u8,
        code: u8,
    },

    #[error("Invalid response from device: {0}")]
    InvalidResponse(String),

    /// Polling cycle could not reach or log in to the device
    #[error("Update failed: {0}")]
    UpdateFailed(String),
}

impl Error {
    /// Check if the device did not answer in time
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_timeout() {
        assert!(Error::from(racklink_transport::Error::ReadTimeout).is_timeout());
        assert!(!Error::from(racklink_transport::Error::ConnectionClosed).is_timeout());
        assert!(!Error::NotConnected.is_timeout());
        assert!(!Error::Nack { command: 0x22, code: 0x05 }.is_timeout());
    }
}
