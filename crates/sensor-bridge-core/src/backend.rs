//! Static per-sensor backend table.
//!
//! Maps each sensor type to the names, object paths, record sizes and
//! read-value methods the hub exposes for it.

use sensor_bridge_hub::RawReading;
use sensor_bridge_types::{
    AlsSample, CompassSample, LidSample, MagnetometerSample, OrientationSample, ProximitySample,
    Sample, ScalarSample, SensorId, XyzSample,
};
use sensor_bridge_wire::sample_size;

/// Everything the driver needs to talk to the hub about one sensor type.
#[derive(Debug, Clone, Copy)]
pub struct SensorBackend {
    pub id: SensorId,
    /// Plugin/sensor name used for load and session requests.
    pub name: &'static str,
    /// Object path used for per-sensor method calls.
    pub object_path: &'static str,
    /// Fixed wire record size on the data socket.
    pub sample_size: usize,
    /// Property read when querying the current value, if the sensor has one.
    pub value_method: Option<&'static str>,
}

macro_rules! backend {
    ($id:ident, $path:literal, $method:expr) => {
        SensorBackend {
            id: SensorId::$id,
            name: SensorId::$id.hub_name(),
            object_path: $path,
            sample_size: sample_size(SensorId::$id),
            value_method: $method,
        }
    };
}

/// Backend table, indexed by `SensorId as usize`.
static BACKENDS: [SensorBackend; 14] = [
    backend!(Proximity, "/SensorManager/proximitysensor", Some("proximity")),
    backend!(AmbientLight, "/SensorManager/alssensor", Some("lux")),
    backend!(
        Orientation,
        "/SensorManager/orientationsensor",
        Some("orientation")
    ),
    backend!(
        Accelerometer,
        "/SensorManager/accelerometersensor",
        Some("xyz")
    ),
    backend!(Compass, "/SensorManager/compasssensor", Some("value")),
    backend!(Gyroscope, "/SensorManager/gyroscopesensor", Some("value")),
    backend!(Lid, "/SensorManager/lidsensor", Some("state")),
    backend!(Humidity, "/SensorManager/humiditysensor", Some("humidity")),
    backend!(
        Magnetometer,
        "/SensorManager/magnetometersensor",
        Some("magneticField")
    ),
    backend!(Pressure, "/SensorManager/pressuresensor", Some("pressure")),
    backend!(Rotation, "/SensorManager/rotationsensor", Some("rotation")),
    backend!(
        StepCounter,
        "/SensorManager/stepcountersensor",
        Some("steps")
    ),
    backend!(Tap, "/SensorManager/tapsensor", None),
    backend!(
        Temperature,
        "/SensorManager/temperaturesensor",
        Some("temperature")
    ),
];

/// Look up the backend for a sensor type.
pub fn backend(id: SensorId) -> &'static SensorBackend {
    &BACKENDS[id as usize]
}

/// Decode a read-value reply into a typed sample.
///
/// Returns `None` when the field count or a field range does not match the
/// sensor's expected shape; the caller treats that the same as no reply.
pub fn decode_reading(id: SensorId, reading: &RawReading) -> Option<Sample> {
    fn to_i32(v: i64) -> Option<i32> {
        i32::try_from(v).ok()
    }
    fn to_u32(v: i64) -> Option<u32> {
        u32::try_from(v).ok()
    }

    let ts = reading.timestamp;
    let f = &reading.fields;
    let sample = match id {
        SensorId::Proximity => {
            let [distance, within] = f.as_slice() else {
                return None;
            };
            Sample::Proximity(ProximitySample {
                timestamp: ts,
                distance_mm: to_u32(*distance)? as f32,
                covered: *within != 0,
            })
        }
        SensorId::AmbientLight => {
            let [lux] = f.as_slice() else { return None };
            Sample::AmbientLight(AlsSample {
                timestamp: ts,
                lux: to_u32(*lux)?,
            })
        }
        SensorId::Orientation => {
            let [state] = f.as_slice() else { return None };
            Sample::Orientation(OrientationSample {
                timestamp: ts,
                state: to_i32(*state)?,
            })
        }
        SensorId::Accelerometer | SensorId::Gyroscope | SensorId::Rotation => {
            let [x, y, z] = f.as_slice() else { return None };
            let xyz = XyzSample {
                timestamp: ts,
                x: to_i32(*x)?,
                y: to_i32(*y)?,
                z: to_i32(*z)?,
            };
            match id {
                SensorId::Accelerometer => Sample::Accelerometer(xyz),
                SensorId::Gyroscope => Sample::Gyroscope(xyz),
                _ => Sample::Rotation(xyz),
            }
        }
        SensorId::Compass => {
            let [degrees, level] = f.as_slice() else {
                return None;
            };
            Sample::Compass(CompassSample {
                timestamp: ts,
                degrees: to_i32(*degrees)?,
                level: to_i32(*level)?,
            })
        }
        SensorId::Lid => {
            let [lid_type, state] = f.as_slice() else {
                return None;
            };
            Sample::Lid(LidSample {
                timestamp: ts,
                lid_type: to_i32(*lid_type)?,
                state: to_u32(*state)?,
            })
        }
        SensorId::Magnetometer => {
            let [x, y, z, level] = f.as_slice() else {
                return None;
            };
            Sample::Magnetometer(MagnetometerSample {
                timestamp: ts,
                x: to_i32(*x)?,
                y: to_i32(*y)?,
                z: to_i32(*z)?,
                level: to_i32(*level)?,
            })
        }
        SensorId::Humidity | SensorId::Pressure | SensorId::StepCounter | SensorId::Temperature => {
            let [value] = f.as_slice() else { return None };
            let scalar = ScalarSample {
                timestamp: ts,
                value: to_u32(*value)?,
            };
            match id {
                SensorId::Humidity => Sample::Humidity(scalar),
                SensorId::Pressure => Sample::Pressure(scalar),
                SensorId::StepCounter => Sample::StepCounter(scalar),
                _ => Sample::Temperature(scalar),
            }
        }
        // Tap gestures are transient; there is no current value to read.
        SensorId::Tap => return None,
    };
    Some(sample)
}
