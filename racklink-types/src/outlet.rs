//! Power outlet structures

use std::fmt;

/// Power outlet as last read from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outlet {
    /// 1-based outlet index
    pub index: u8,

    /// Power state, `None` when the device did not report it
    pub state: Option<bool>,

    /// Outlet name (user-assigned on the device)
    pub name: String,
}

impl Outlet {
    pub fn new(index: u8, state: Option<bool>, name: impl Into<String>) -> Self {
        Self {
            index,
            state,
            name: name.into(),
        }
    }

    /// Outlet whose state and name could not be fetched
    pub fn placeholder(index: u8) -> Self {
        Self {
            index,
            state: None,
            name: Self::default_name(index),
        }
    }

    /// Name used when the device reports none
    pub fn default_name(index: u8) -> String {
        format!("Outlet {}", index)
    }

    pub fn is_on(&self) -> bool {
        self.state == Some(true)
    }

    /// Human-readable state
    pub fn state_label(&self) -> &'static str {
        match self.state {
            Some(true) => "ON",
            Some(false) => "OFF",
            None => "UNKNOWN",
        }
    }
}

impl fmt::Display for Outlet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Outlet[{}: {} = {}]", self.index, self.name, self.state_label())
    }
}
