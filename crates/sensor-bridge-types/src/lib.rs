//! Shared types for sensor-bridge.
//!
//! This crate contains the types shared across the sensor-bridge workspace:
//! sensor identifiers, the per-sensor sample structs, and the decoded values
//! delivered to listeners.

pub mod sample;
pub mod sensor;
pub mod value;

pub use sample::{
    AlsSample, CompassSample, LidSample, MagnetometerSample, OrientationSample, ProximitySample,
    Sample, ScalarSample, TapSample, XyzSample,
};
pub use sensor::{SensorId, UnknownSensor};
pub use value::SensorValue;
