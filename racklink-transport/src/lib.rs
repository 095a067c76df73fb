//! Transport layer for the RackLink protocol
//!
//! Provides byte-level TCP communication with devices.

pub mod error;
pub mod tcp;

pub use error::{Error, Result};
pub use tcp::TcpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport trait for different communication methods
///
/// Implementations own the underlying stream exclusively. Every read is
/// bounded by a timeout.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to device
    async fn connect(&mut self) -> Result<()>;

    /// Disconnect from device
    ///
    /// Idempotent; releases the stream regardless of prior state.
    async fn disconnect(&mut self);

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Read exactly `len` bytes
    async fn read_exact(&mut self, len: usize, timeout: Duration) -> Result<BytesMut>;

    /// Write and flush raw bytes
    async fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}
