//! Typed sensor samples.
//!
//! One struct per wire record shape. A sample is always replaced as a whole;
//! nothing in the workspace updates individual fields of a cached sample.

use crate::sensor::SensorId;

/// Ambient light level reported when no real reading is available.
pub const DEFAULT_LUX: u32 = 400;

/// Orientation state code meaning "undefined".
pub const ORIENTATION_UNDEFINED: i32 = 0;

/// Proximity sample: distance plus the covered/uncovered decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximitySample {
    pub timestamp: u64,
    pub distance_mm: f32,
    pub covered: bool,
}

/// Ambient light sample in lux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlsSample {
    pub timestamp: u64,
    pub lux: u32,
}

/// Device orientation state code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientationSample {
    pub timestamp: u64,
    pub state: i32,
}

/// Three-axis sample (accelerometer, gyroscope, rotation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XyzSample {
    pub timestamp: u64,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Magnetometer sample: three axes plus calibration level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagnetometerSample {
    pub timestamp: u64,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub level: i32,
}

/// Compass sample: heading in degrees plus calibration level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompassSample {
    pub timestamp: u64,
    pub degrees: i32,
    pub level: i32,
}

/// Lid sample: which lid plus open/closed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LidSample {
    pub timestamp: u64,
    pub lid_type: i32,
    pub state: u32,
}

/// Single unsigned value sample (humidity, pressure, temperature, steps).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarSample {
    pub timestamp: u64,
    pub value: u32,
}

/// Tap gesture sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapSample {
    pub timestamp: u64,
    pub direction: u32,
    pub tap_type: i32,
}

/// A decoded sample from any sensor type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Proximity(ProximitySample),
    AmbientLight(AlsSample),
    Orientation(OrientationSample),
    Accelerometer(XyzSample),
    Compass(CompassSample),
    Gyroscope(XyzSample),
    Lid(LidSample),
    Humidity(ScalarSample),
    Magnetometer(MagnetometerSample),
    Pressure(ScalarSample),
    Rotation(XyzSample),
    StepCounter(ScalarSample),
    Tap(TapSample),
    Temperature(ScalarSample),
}

impl Sample {
    /// Which sensor type this sample belongs to.
    pub fn sensor(&self) -> SensorId {
        match self {
            Sample::Proximity(_) => SensorId::Proximity,
            Sample::AmbientLight(_) => SensorId::AmbientLight,
            Sample::Orientation(_) => SensorId::Orientation,
            Sample::Accelerometer(_) => SensorId::Accelerometer,
            Sample::Compass(_) => SensorId::Compass,
            Sample::Gyroscope(_) => SensorId::Gyroscope,
            Sample::Lid(_) => SensorId::Lid,
            Sample::Humidity(_) => SensorId::Humidity,
            Sample::Magnetometer(_) => SensorId::Magnetometer,
            Sample::Pressure(_) => SensorId::Pressure,
            Sample::Rotation(_) => SensorId::Rotation,
            Sample::StepCounter(_) => SensorId::StepCounter,
            Sample::Tap(_) => SensorId::Tap,
            Sample::Temperature(_) => SensorId::Temperature,
        }
    }

    /// The hard default delivered while a sensor is not being tracked.
    ///
    /// Proximity defaults to "not covered" so a missing sensor can never
    /// permanently block input or display power.
    pub fn default_for(id: SensorId) -> Sample {
        match id {
            SensorId::Proximity => Sample::Proximity(ProximitySample {
                timestamp: 0,
                distance_mm: f32::MAX,
                covered: false,
            }),
            SensorId::AmbientLight => Sample::AmbientLight(AlsSample {
                timestamp: 0,
                lux: DEFAULT_LUX,
            }),
            SensorId::Orientation => Sample::Orientation(OrientationSample {
                timestamp: 0,
                state: ORIENTATION_UNDEFINED,
            }),
            SensorId::Accelerometer => Sample::Accelerometer(XyzSample {
                timestamp: 0,
                x: 0,
                y: 0,
                z: 0,
            }),
            SensorId::Compass => Sample::Compass(CompassSample {
                timestamp: 0,
                degrees: 0,
                level: 0,
            }),
            SensorId::Gyroscope => Sample::Gyroscope(XyzSample {
                timestamp: 0,
                x: 0,
                y: 0,
                z: 0,
            }),
            SensorId::Lid => Sample::Lid(LidSample {
                timestamp: 0,
                lid_type: 0,
                state: 0,
            }),
            SensorId::Humidity => Sample::Humidity(ScalarSample {
                timestamp: 0,
                value: 0,
            }),
            SensorId::Magnetometer => Sample::Magnetometer(MagnetometerSample {
                timestamp: 0,
                x: 0,
                y: 0,
                z: 0,
                level: 0,
            }),
            SensorId::Pressure => Sample::Pressure(ScalarSample {
                timestamp: 0,
                value: 0,
            }),
            SensorId::Rotation => Sample::Rotation(XyzSample {
                timestamp: 0,
                x: 0,
                y: 0,
                z: 0,
            }),
            SensorId::StepCounter => Sample::StepCounter(ScalarSample {
                timestamp: 0,
                value: 0,
            }),
            SensorId::Tap => Sample::Tap(TapSample {
                timestamp: 0,
                direction: 0,
                tap_type: 0,
            }),
            SensorId::Temperature => Sample::Temperature(ScalarSample {
                timestamp: 0,
                value: 0,
            }),
        }
    }

    /// The forced sample delivered during an exception window.
    ///
    /// Only proximity has one: "covered", the conservative choice while the
    /// hub is starting up or absent.
    pub fn exception_for(id: SensorId) -> Option<Sample> {
        match id {
            SensorId::Proximity => Some(Sample::Proximity(ProximitySample {
                timestamp: 0,
                distance_mm: 0.0,
                covered: true,
            })),
            _ => None,
        }
    }
}
