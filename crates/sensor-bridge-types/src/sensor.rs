//! Sensor identifiers.

use std::str::FromStr;

use thiserror::Error;

/// The closed set of sensor types the bridge knows how to track.
///
/// Proximity, ambient light and orientation are always managed; the
/// remaining types are only brought up when sensor test mode is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SensorId {
    Proximity,
    AmbientLight,
    Orientation,
    Accelerometer,
    Compass,
    Gyroscope,
    Lid,
    Humidity,
    Magnetometer,
    Pressure,
    Rotation,
    StepCounter,
    Tap,
    Temperature,
}

impl SensorId {
    /// Every sensor type, in a stable order.
    pub const ALL: [SensorId; 14] = [
        SensorId::Proximity,
        SensorId::AmbientLight,
        SensorId::Orientation,
        SensorId::Accelerometer,
        SensorId::Compass,
        SensorId::Gyroscope,
        SensorId::Lid,
        SensorId::Humidity,
        SensorId::Magnetometer,
        SensorId::Pressure,
        SensorId::Rotation,
        SensorId::StepCounter,
        SensorId::Tap,
        SensorId::Temperature,
    ];

    /// Whether this sensor is managed regardless of sensor test mode.
    pub fn always_available(self) -> bool {
        matches!(
            self,
            SensorId::Proximity | SensorId::AmbientLight | SensorId::Orientation
        )
    }

    /// The plugin/sensor name the hub knows this sensor by.
    pub const fn hub_name(self) -> &'static str {
        match self {
            SensorId::Proximity => "proximitysensor",
            SensorId::AmbientLight => "alssensor",
            SensorId::Orientation => "orientationsensor",
            SensorId::Accelerometer => "accelerometersensor",
            SensorId::Compass => "compasssensor",
            SensorId::Gyroscope => "gyroscopesensor",
            SensorId::Lid => "lidsensor",
            SensorId::Humidity => "humiditysensor",
            SensorId::Magnetometer => "magnetometersensor",
            SensorId::Pressure => "pressuresensor",
            SensorId::Rotation => "rotationsensor",
            SensorId::StepCounter => "stepcountersensor",
            SensorId::Tap => "tapsensor",
            SensorId::Temperature => "temperaturesensor",
        }
    }
}

impl std::fmt::Display for SensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.hub_name())
    }
}

/// Error returned when parsing an unrecognized sensor name.
#[derive(Debug, Error)]
#[error("unknown sensor name: {0}")]
pub struct UnknownSensor(pub String);

impl FromStr for SensorId {
    type Err = UnknownSensor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorId::ALL
            .into_iter()
            .find(|id| id.hub_name() == s)
            .ok_or_else(|| UnknownSensor(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_names_roundtrip() {
        for id in SensorId::ALL {
            let parsed: SensorId = id.hub_name().parse().unwrap();
            assert_eq!(parsed, id);
        }
    }

    #[test]
    fn unknown_name_rejected() {
        assert!("bogussensor".parse::<SensorId>().is_err());
    }

    #[test]
    fn exactly_three_always_available() {
        let count = SensorId::ALL.iter().filter(|s| s.always_available()).count();
        assert_eq!(count, 3);
    }
}
