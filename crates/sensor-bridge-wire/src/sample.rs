//! Binary sample record codecs, one layout per sensor type.
//!
//! All records are packed little-endian. Sizes here are the single source of
//! truth for the frame parser; `decode_sample` rejects records of any other
//! length before reading fields.

use sensor_bridge_types::sample::{
    AlsSample, CompassSample, LidSample, MagnetometerSample, OrientationSample, ProximitySample,
    Sample, ScalarSample, TapSample, XyzSample,
};
use sensor_bridge_types::SensorId;

use crate::error::WireError;
use crate::reader::Cursor;

/// Size in bytes of one wire record for the given sensor type.
pub const fn sample_size(id: SensorId) -> usize {
    match id {
        // u64 timestamp + f32 distance + u8 covered
        SensorId::Proximity => 13,
        // u64 timestamp + u32 value
        SensorId::AmbientLight
        | SensorId::Humidity
        | SensorId::Pressure
        | SensorId::StepCounter
        | SensorId::Temperature => 12,
        // u64 timestamp + i32 state
        SensorId::Orientation => 12,
        // u64 timestamp + 3 x i32
        SensorId::Accelerometer | SensorId::Gyroscope | SensorId::Rotation => 20,
        // u64 timestamp + i32 degrees + i32 level
        SensorId::Compass => 16,
        // u64 timestamp + i32 type + u32 state
        SensorId::Lid => 16,
        // u64 timestamp + 3 x i32 + i32 level
        SensorId::Magnetometer => 24,
        // u64 timestamp + u32 direction + i32 type
        SensorId::Tap => 16,
    }
}

/// Decode one wire record into a typed sample.
pub fn decode_sample(id: SensorId, bytes: &[u8]) -> Result<Sample, WireError> {
    let expected = sample_size(id);
    if bytes.len() != expected {
        return Err(WireError::BadRecordSize {
            sensor: id.hub_name(),
            expected,
            actual: bytes.len(),
        });
    }

    let mut cur = Cursor::new(bytes);
    let timestamp = cur.read_u64()?;

    let sample = match id {
        SensorId::Proximity => Sample::Proximity(ProximitySample {
            timestamp,
            distance_mm: cur.read_f32()?,
            covered: cur.read_u8()? != 0,
        }),
        SensorId::AmbientLight => Sample::AmbientLight(AlsSample {
            timestamp,
            lux: cur.read_u32()?,
        }),
        SensorId::Orientation => Sample::Orientation(OrientationSample {
            timestamp,
            state: cur.read_i32()?,
        }),
        SensorId::Accelerometer => Sample::Accelerometer(read_xyz(timestamp, &mut cur)?),
        SensorId::Gyroscope => Sample::Gyroscope(read_xyz(timestamp, &mut cur)?),
        SensorId::Rotation => Sample::Rotation(read_xyz(timestamp, &mut cur)?),
        SensorId::Compass => Sample::Compass(CompassSample {
            timestamp,
            degrees: cur.read_i32()?,
            level: cur.read_i32()?,
        }),
        SensorId::Lid => Sample::Lid(LidSample {
            timestamp,
            lid_type: cur.read_i32()?,
            state: cur.read_u32()?,
        }),
        SensorId::Magnetometer => Sample::Magnetometer(MagnetometerSample {
            timestamp,
            x: cur.read_i32()?,
            y: cur.read_i32()?,
            z: cur.read_i32()?,
            level: cur.read_i32()?,
        }),
        SensorId::Humidity => Sample::Humidity(read_scalar(timestamp, &mut cur)?),
        SensorId::Pressure => Sample::Pressure(read_scalar(timestamp, &mut cur)?),
        SensorId::StepCounter => Sample::StepCounter(read_scalar(timestamp, &mut cur)?),
        SensorId::Temperature => Sample::Temperature(read_scalar(timestamp, &mut cur)?),
        SensorId::Tap => Sample::Tap(TapSample {
            timestamp,
            direction: cur.read_u32()?,
            tap_type: cur.read_i32()?,
        }),
    };

    Ok(sample)
}

fn read_xyz(timestamp: u64, cur: &mut Cursor<'_>) -> Result<XyzSample, WireError> {
    Ok(XyzSample {
        timestamp,
        x: cur.read_i32()?,
        y: cur.read_i32()?,
        z: cur.read_i32()?,
    })
}

fn read_scalar(timestamp: u64, cur: &mut Cursor<'_>) -> Result<ScalarSample, WireError> {
    Ok(ScalarSample {
        timestamp,
        value: cur.read_u32()?,
    })
}
