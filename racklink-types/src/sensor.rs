//! Sensor definitions

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Sensors exposed by RackLink units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SensorKind {
    /// Degrees Fahrenheit
    Temperature,

    /// RMS volts
    Voltage,

    /// RMS amperes
    Current,

    /// Watts
    Power,

    PowerFactor,

    ThermalLoad,

    Occupancy,
}

impl SensorKind {
    /// All sensors, in device opcode order
    pub const ALL: [SensorKind; 7] = [
        Self::Temperature,
        Self::Voltage,
        Self::Current,
        Self::Power,
        Self::PowerFactor,
        Self::ThermalLoad,
        Self::Occupancy,
    ];

    /// Stable snake_case name
    pub fn name(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Voltage => "voltage",
            Self::Current => "current",
            Self::Power => "power",
            Self::PowerFactor => "power_factor",
            Self::ThermalLoad => "thermal_load",
            Self::Occupancy => "occupancy",
        }
    }

    /// Unit suffix for display, empty for dimensionless values
    pub fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°F",
            Self::Voltage => "V",
            Self::Current => "A",
            Self::Power => "W",
            Self::PowerFactor | Self::ThermalLoad | Self::Occupancy => "",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SensorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");

        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| Error::Parse(format!("unknown sensor: {}", s)))
    }
}
