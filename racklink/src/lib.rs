//! # racklink
//!
//! Rust client for the RackLink power distribution unit protocol.
//!
//! ## Features
//!
//! - Framed binary protocol over TCP with escaping and checksums
//! - Login handshake and inline keepalive replies
//! - Outlet control and sensor readings
//! - Polling driver producing device snapshots
//!
//! ## Quick Start
//!
//! ```no_run
//! use racklink::Client;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut client = Client::new("192.168.1.50", racklink::DEFAULT_PORT);
//!
//!     if !client.connect().await || !client.login("user", "password").await {
//!         eprintln!("cannot reach device");
//!         return;
//!     }
//!
//!     if let Some(count) = client.outlet_count().await {
//!         for i in 1..=count {
//!             println!("{}: {:?}", i, client.outlet_state(i).await);
//!         }
//!     }
//!
//!     client.disconnect().await;
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod poller;

// Re-exports
pub use client::Client;
pub use config::{ClientConfig, PollerConfig};
pub use error::{Error, Result};
pub use poller::{Poller, PollerHandle};

// Re-export types
pub use racklink_core::constants::{DEFAULT_USERNAME, LOGIN_SEPARATOR};
pub use racklink_core::{Command, DEFAULT_PORT, Envelope, Session, Subcommand};
pub use racklink_types::{DeviceSnapshot, Outlet, SensorKind};
