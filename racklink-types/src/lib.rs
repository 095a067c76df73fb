//! Type definitions for racklink

pub mod error;
pub mod outlet;
pub mod sensor;
pub mod snapshot;

pub use error::{Error, Result};
pub use outlet::Outlet;
pub use sensor::SensorKind;
pub use snapshot::DeviceSnapshot;
