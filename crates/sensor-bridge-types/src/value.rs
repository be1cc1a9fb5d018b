//! Decoded values delivered to listeners.

use crate::sample::Sample;

/// The value a registered listener receives for a sensor.
///
/// Only proximity, ambient light and orientation are exposed; the other
/// sensor types are tracked internally but have no listener-facing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorValue {
    /// Proximity sensor is covered.
    Proximity { covered: bool },
    /// Ambient light level in lux.
    AmbientLight { lux: u32 },
    /// Orientation state code.
    Orientation { state: i32 },
}

impl SensorValue {
    /// Project a sample onto its listener-facing value, if it has one.
    pub fn from_sample(sample: &Sample) -> Option<SensorValue> {
        match sample {
            Sample::Proximity(ps) => Some(SensorValue::Proximity {
                covered: ps.covered,
            }),
            Sample::AmbientLight(als) => Some(SensorValue::AmbientLight { lux: als.lux }),
            Sample::Orientation(o) => Some(SensorValue::Orientation { state: o.state }),
            _ => None,
        }
    }
}

impl std::fmt::Display for SensorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorValue::Proximity { covered } => {
                write!(f, "proximity={}", if *covered { "covered" } else { "open" })
            }
            SensorValue::AmbientLight { lux } => write!(f, "als={lux}lx"),
            SensorValue::Orientation { state } => write!(f, "orientation={state}"),
        }
    }
}
