//! Protocol constants

/// Start-of-packet marker
pub const HEADER: u8 = 0xFE;

/// End-of-packet marker
pub const TAIL: u8 = 0xFF;

/// Escape sentinel. Protected bytes are sent as `ESCAPE, !byte`.
pub const ESCAPE: u8 = 0xFD;

/// Destination byte used for every client-originated envelope
pub const DESTINATION: u8 = 0x00;

/// Default connect/login/command timeout (seconds)
pub const DEFAULT_TIMEOUT: u64 = 5;

/// Default client ping timeout (seconds)
pub const DEFAULT_PING_TIMEOUT: u64 = 3;

/// Default polling interval (seconds)
pub const DEFAULT_POLL_INTERVAL: u64 = 30;

/// Default login user
pub const DEFAULT_USERNAME: &str = "user";

/// Separator between username and password in the login payload
pub const LOGIN_SEPARATOR: char = '|';

/// First payload byte of a LOGIN response when credentials were accepted
pub const LOGIN_ACCEPTED: u8 = 0x01;

/// Outlet power state bytes
pub mod outlet {
    /// Outlet is switched off
    pub const OFF: u8 = 0x00;

    /// Outlet is switched on
    pub const ON: u8 = 0x01;

    /// Outlet count assumed when the device does not report a usable one
    pub const DEFAULT_COUNT: u8 = 8;

    /// Largest outlet count accepted from a device
    pub const MAX_COUNT: u8 = 16;
}
