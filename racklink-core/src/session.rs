//! Session state for a RackLink connection
//!
//! A session tracks:
//! - Connectivity (disconnected, connected, authenticated)
//! - Outlet count reported by the device, once known

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{Error, Result};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not connected
    Disconnected,

    /// TCP stream open, not logged in
    Connected,

    /// Logged in and ready for commands
    Authenticated,
}

/// Session manager
///
/// Thread-safe and can be cloned cheaply (Arc internally), so observers can
/// read connectivity while the owning client drives the connection.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Current session state
    state: parking_lot::RwLock<SessionState>,

    /// Outlet count reported by the device (0 when unknown)
    outlet_count: AtomicU8,
}

impl Session {
    /// Create a new disconnected session
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: parking_lot::RwLock::new(SessionState::Disconnected),
                outlet_count: AtomicU8::new(0),
            }),
        }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        *self.inner.state.read()
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        !matches!(self.state(), SessionState::Disconnected)
    }

    /// Check if authenticated
    pub fn is_authenticated(&self) -> bool {
        matches!(self.state(), SessionState::Authenticated)
    }

    /// Mark the stream as open
    pub fn open(&self) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != SessionState::Disconnected {
            return Err(Error::InvalidSessionState(format!(
                "Cannot open from state: {:?}",
                *state
            )));
        }

        *state = SessionState::Connected;
        Ok(())
    }

    /// Mark session as authenticated
    pub fn authenticate(&self) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != SessionState::Connected {
            return Err(Error::InvalidSessionState(format!(
                "Cannot authenticate from state: {:?}",
                *state
            )));
        }

        *state = SessionState::Authenticated;
        Ok(())
    }

    /// Close session
    ///
    /// Valid from any state. The cached outlet count survives, the device
    /// does not change it between connections.
    pub fn close(&self) {
        *self.inner.state.write() = SessionState::Disconnected;
    }

    /// Cached outlet count
    pub fn outlet_count(&self) -> Option<u8> {
        match self.inner.outlet_count.load(Ordering::Acquire) {
            0 => None,
            count => Some(count),
        }
    }

    /// Remember the outlet count reported by the device
    ///
    /// A count of 0 clears the cache.
    pub fn cache_outlet_count(&self, count: u8) {
        self.inner.outlet_count.store(count, Ordering::Release);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
