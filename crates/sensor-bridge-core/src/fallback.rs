//! Kernel event device fallback.
//!
//! Some devices report proximity or ambient light through plain input
//! devices instead of (or more reliably than) the hub. A reader task turns
//! those events into samples; once one is attached the cache prefers its
//! data over anything the hub says for the same sensor.

use std::os::fd::OwnedFd;

use evdev::{AbsoluteAxisCode, Device, EventSummary, InputEvent, SwitchCode};
use tokio::sync::mpsc;
use tracing::warn;

use sensor_bridge_types::{AlsSample, ProximitySample, Sample, SensorId};

use crate::bridge::BridgeEvent;

/// Convert one kernel input event into a sample, if it is relevant for the
/// sensor the device was attached as.
pub(crate) fn convert_event(sensor: SensorId, ev: &InputEvent) -> Option<Sample> {
    let timestamp = ev
        .timestamp()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .ok()
        .and_then(|d| u64::try_from(d.as_micros()).ok())
        .unwrap_or(0);

    match (sensor, ev.destructure()) {
        (SensorId::Proximity, EventSummary::Switch(_, SwitchCode::SW_FRONT_PROXIMITY, value)) => {
            Some(Sample::Proximity(ProximitySample {
                timestamp,
                distance_mm: if value != 0 { 0.0 } else { f32::MAX },
                covered: value != 0,
            }))
        }
        (SensorId::Proximity, EventSummary::AbsoluteAxis(_, AbsoluteAxisCode::ABS_DISTANCE, value)) => {
            Some(Sample::Proximity(ProximitySample {
                timestamp,
                distance_mm: value as f32,
                covered: value == 0,
            }))
        }
        (SensorId::AmbientLight, EventSummary::AbsoluteAxis(_, AbsoluteAxisCode::ABS_MISC, value)) => {
            let lux = u32::try_from(value).ok()?;
            Some(Sample::AmbientLight(AlsSample { timestamp, lux }))
        }
        _ => None,
    }
}

pub(crate) async fn run_evdev_reader(
    sensor: SensorId,
    fd: OwnedFd,
    token: u64,
    tx: mpsc::UnboundedSender<BridgeEvent>,
) {
    let device = match Device::from_fd(fd) {
        Ok(device) => device,
        Err(e) => {
            warn!(%sensor, error = %e, "failed to open event device");
            return;
        }
    };
    let mut stream = match device.into_event_stream() {
        Ok(stream) => stream,
        Err(e) => {
            warn!(%sensor, error = %e, "failed to create event stream");
            return;
        }
    };

    loop {
        match stream.next_event().await {
            Ok(ev) => {
                if let Some(sample) = convert_event(sensor, &ev) {
                    if tx
                        .send(BridgeEvent::EvdevSample {
                            sensor,
                            token,
                            sample,
                        })
                        .is_err()
                    {
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(%sensor, error = %e, "event device read error");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::EventType;

    #[test]
    fn proximity_switch_event_converts() {
        let ev = InputEvent::new(EventType::SWITCH.0, SwitchCode::SW_FRONT_PROXIMITY.0, 1);
        let Some(Sample::Proximity(ps)) = convert_event(SensorId::Proximity, &ev) else {
            panic!("expected proximity sample");
        };
        assert!(ps.covered);
    }

    #[test]
    fn distance_axis_zero_means_covered() {
        let ev = InputEvent::new(
            EventType::ABSOLUTE.0,
            AbsoluteAxisCode::ABS_DISTANCE.0,
            0,
        );
        let Some(Sample::Proximity(ps)) = convert_event(SensorId::Proximity, &ev) else {
            panic!("expected proximity sample");
        };
        assert!(ps.covered);

        let ev = InputEvent::new(
            EventType::ABSOLUTE.0,
            AbsoluteAxisCode::ABS_DISTANCE.0,
            5,
        );
        let Some(Sample::Proximity(ps)) = convert_event(SensorId::Proximity, &ev) else {
            panic!("expected proximity sample");
        };
        assert!(!ps.covered);
    }

    #[test]
    fn misc_axis_converts_to_lux() {
        let ev = InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_MISC.0, 640);
        let Some(Sample::AmbientLight(als)) = convert_event(SensorId::AmbientLight, &ev) else {
            panic!("expected als sample");
        };
        assert_eq!(als.lux, 640);
    }

    #[test]
    fn irrelevant_events_are_dropped() {
        let ev = InputEvent::new(EventType::SWITCH.0, SwitchCode::SW_FRONT_PROXIMITY.0, 1);
        assert!(convert_event(SensorId::AmbientLight, &ev).is_none());

        let ev = InputEvent::new(EventType::KEY.0, 30, 1);
        assert!(convert_event(SensorId::Proximity, &ev).is_none());
    }

    #[test]
    fn negative_lux_is_dropped() {
        let ev = InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_MISC.0, -1);
        assert!(convert_event(SensorId::AmbientLight, &ev).is_none());
    }
}
