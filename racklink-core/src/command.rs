//! RackLink command and subcommand definitions

use std::fmt;

use crate::error::{Error, Result};

/// Protocol command codes
///
/// The second byte of every envelope.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    // Session
    Ping = 0x01,
    Login = 0x02,

    // Device-side rejection, one error-code byte of payload
    Nack = 0x10,

    // Outlets
    PowerOutlets = 0x20,
    OutletName = 0x21,
    OutletCount = 0x22,

    // Sensors
    Temperature = 0x50,
    Voltage = 0x51,
    Current = 0x52,
    Power = 0x53,
    PowerFactor = 0x54,
    ThermalLoad = 0x55,
    Occupancy = 0x56,
}

impl Command {
    /// Check if this command reads a sensor
    pub fn is_sensor(self) -> bool {
        (0x50..=0x56).contains(&(self as u8))
    }

    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::Ping => "CMD_PING",
            Self::Login => "CMD_LOGIN",
            Self::Nack => "CMD_NACK",
            Self::PowerOutlets => "CMD_POWER_OUTLETS",
            Self::OutletName => "CMD_OUTLET_NAME",
            Self::OutletCount => "CMD_OUTLET_COUNT",
            Self::Temperature => "CMD_TEMPERATURE",
            Self::Voltage => "CMD_VOLTAGE",
            Self::Current => "CMD_CURRENT",
            Self::Power => "CMD_POWER",
            Self::PowerFactor => "CMD_POWER_FACTOR",
            Self::ThermalLoad => "CMD_THERMAL_LOAD",
            Self::Occupancy => "CMD_OCCUPANCY",
        }
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> u8 {
        cmd as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Ping),
            0x02 => Ok(Self::Login),
            0x10 => Ok(Self::Nack),
            0x20 => Ok(Self::PowerOutlets),
            0x21 => Ok(Self::OutletName),
            0x22 => Ok(Self::OutletCount),
            0x50 => Ok(Self::Temperature),
            0x51 => Ok(Self::Voltage),
            0x52 => Ok(Self::Current),
            0x53 => Ok(Self::Power),
            0x54 => Ok(Self::PowerFactor),
            0x55 => Ok(Self::ThermalLoad),
            0x56 => Ok(Self::Occupancy),
            _ => Err(Error::UnknownCommand(value)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

/// Role of an envelope relative to its command
///
/// The third byte of every envelope.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Subcommand {
    Set = 0x01,
    Get = 0x02,
    Response = 0x10,
}

impl Subcommand {
    pub fn name(self) -> &'static str {
        match self {
            Self::Set => "SUB_SET",
            Self::Get => "SUB_GET",
            Self::Response => "SUB_RESPONSE",
        }
    }
}

impl From<Subcommand> for u8 {
    fn from(sub: Subcommand) -> u8 {
        sub as u8
    }
}

impl TryFrom<u8> for Subcommand {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Set),
            0x02 => Ok(Self::Get),
            0x10 => Ok(Self::Response),
            _ => Err(Error::UnknownSubcommand(value)),
        }
    }
}

impl fmt::Display for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}
