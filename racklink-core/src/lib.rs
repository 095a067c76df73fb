//! # racklink-core
//!
//! Core protocol implementation for RackLink power distribution units.
//!
//! This crate provides the low-level protocol primitives:
//! - Byte stuffing (escape/unescape)
//! - Checksum calculation
//! - Packet structure and encoding/decoding
//! - Command definitions and payload decoders
//! - Protocol constants

pub mod checksum;
pub mod command;
pub mod constants;
pub mod decode;
pub mod error;
pub mod escape;
pub mod packet;
pub mod session;

pub use command::{Command, Subcommand};
pub use error::{Error, Result};
pub use packet::{Envelope, build_packet, parse_packet};
pub use session::{Session, SessionState};

/// Default device port
pub const DEFAULT_PORT: u16 = 60000;
