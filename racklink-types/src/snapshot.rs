//! Point-in-time device state

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::{outlet::Outlet, sensor::SensorKind};

/// Snapshot produced by one polling cycle
///
/// Owned copy; holding one never blocks the connection that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    /// Outlets keyed by 1-based index
    pub outlets: BTreeMap<u8, Outlet>,

    /// Sensor readings, `None` when the device gave no usable value
    pub sensors: BTreeMap<SensorKind, Option<f64>>,

    /// Whether the connection was still up at the end of the cycle
    pub connected: bool,

    /// When the cycle finished
    pub taken_at: DateTime<Utc>,
}

impl DeviceSnapshot {
    pub fn new(connected: bool) -> Self {
        Self {
            outlets: BTreeMap::new(),
            sensors: BTreeMap::new(),
            connected,
            taken_at: Utc::now(),
        }
    }

    pub fn outlet(&self, index: u8) -> Option<&Outlet> {
        self.outlets.get(&index)
    }

    /// Reading for a sensor, flattening "not polled" and "no value"
    pub fn sensor(&self, kind: SensorKind) -> Option<f64> {
        self.sensors.get(&kind).copied().flatten()
    }

    /// Record a power change acknowledged by the device
    ///
    /// Returns false if the outlet is not part of the snapshot.
    pub fn set_outlet_state(&mut self, index: u8, on: bool) -> bool {
        match self.outlets.get_mut(&index) {
            Some(outlet) => {
                outlet.state = Some(on);
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for DeviceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Snapshot[{} outlets, {} sensors, connected={}, at {}]",
            self.outlets.len(),
            self.sensors.len(),
            self.connected,
            self.taken_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_outlet_state() {
        let mut snapshot = DeviceSnapshot::new(true);
        snapshot.outlets.insert(1, Outlet::new(1, Some(false), "Router"));

        assert!(snapshot.set_outlet_state(1, true));
        assert_eq!(snapshot.outlet(1), Some(&Outlet::new(1, Some(true), "Router")));

        assert!(!snapshot.set_outlet_state(2, true));
    }

    #[test]
    fn test_sensor_lookup() {
        let mut snapshot = DeviceSnapshot::new(true);
        snapshot.sensors.insert(SensorKind::Voltage, Some(120.5));
        snapshot.sensors.insert(SensorKind::Current, None);

        assert_eq!(snapshot.sensor(SensorKind::Voltage), Some(120.5));
        assert_eq!(snapshot.sensor(SensorKind::Current), None);
        assert_eq!(snapshot.sensor(SensorKind::Power), None);
    }
}
