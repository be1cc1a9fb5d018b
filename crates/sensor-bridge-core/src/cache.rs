//! Last-known-value cache and listener delivery policy.
//!
//! Every sample the bridge learns about funnels through here as a
//! [`CacheEvent`]. The cache tracks, per sensor, the last received sample,
//! whether that sample is currently trustworthy, and whether a kernel event
//! source has taken over from the hub's data socket. `apply` returns the
//! value to deliver to the sensor's listener, if any.

use std::collections::BTreeMap;

use sensor_bridge_types::{Sample, SensorId, SensorValue};

/// A cache update or delivery request for one sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheEvent {
    /// Drop the cached sample back to the hard default and stop trusting it.
    Reset,
    /// Start trusting the cached sample again without changing it.
    Restore,
    /// Re-deliver whatever the current policy selects.
    Repeat,
    /// Stop trusting the cached sample without changing it.
    Forget,
    /// New sample from a kernel event device.
    Kernel(Sample),
    /// New sample from the hub (data socket or read-value reply).
    Hub(Sample),
}

#[derive(Debug)]
struct Entry {
    cached: Sample,
    default: Sample,
    tracking: bool,
    /// Once a kernel source is attached, hub samples are ignored for good.
    kernel_source: bool,
}

impl Entry {
    fn new(id: SensorId) -> Self {
        let default = Sample::default_for(id);
        Self {
            cached: default,
            default,
            tracking: false,
            kernel_source: false,
        }
    }
}

/// Per-sensor sample cache.
#[derive(Debug, Default)]
pub struct NotifyCache {
    entries: BTreeMap<SensorId, Entry>,
}

impl NotifyCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, id: SensorId) -> &mut Entry {
        self.entries.entry(id).or_insert_with(|| Entry::new(id))
    }

    /// Mark a sensor as fed by a kernel event device. Hub samples for it are
    /// discarded from now on.
    pub fn mark_kernel_source(&mut self, id: SensorId) {
        self.entry(id).kernel_source = true;
    }

    /// Apply one event and compute the value to deliver, if any.
    ///
    /// `exception_active` forces proximity to report covered regardless of
    /// the cache contents.
    pub fn apply(
        &mut self,
        id: SensorId,
        event: CacheEvent,
        exception_active: bool,
    ) -> Option<SensorValue> {
        let entry = self.entry(id);
        match event {
            CacheEvent::Reset => {
                entry.cached = entry.default;
                entry.tracking = false;
            }
            CacheEvent::Restore => entry.tracking = true,
            CacheEvent::Forget => entry.tracking = false,
            CacheEvent::Repeat => {}
            CacheEvent::Kernel(sample) => {
                entry.cached = sample;
                entry.tracking = true;
            }
            CacheEvent::Hub(sample) => {
                if entry.kernel_source {
                    tracing::trace!(sensor = %id, "hub sample ignored, kernel source active");
                    return None;
                }
                entry.cached = sample;
            }
        }

        let sample = if exception_active {
            match Sample::exception_for(id) {
                Some(forced) => forced,
                None if entry.tracking => entry.cached,
                None => entry.default,
            }
        } else if entry.tracking {
            entry.cached
        } else {
            entry.default
        };
        SensorValue::from_sample(&sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_bridge_types::{AlsSample, ProximitySample};

    fn covered(ts: u64) -> Sample {
        Sample::Proximity(ProximitySample {
            timestamp: ts,
            distance_mm: 0.0,
            covered: true,
        })
    }

    #[test]
    fn untracked_sensor_delivers_default() {
        let mut cache = NotifyCache::new();
        let value = cache.apply(SensorId::Proximity, CacheEvent::Repeat, false);
        assert_eq!(value, Some(SensorValue::Proximity { covered: false }));
    }

    #[test]
    fn hub_sample_cached_but_untrusted_until_restore() {
        let mut cache = NotifyCache::new();
        let value = cache.apply(SensorId::Proximity, CacheEvent::Hub(covered(1)), false);
        // Not tracking yet, so the default wins.
        assert_eq!(value, Some(SensorValue::Proximity { covered: false }));

        let value = cache.apply(SensorId::Proximity, CacheEvent::Restore, false);
        assert_eq!(value, Some(SensorValue::Proximity { covered: true }));
    }

    #[test]
    fn forget_falls_back_to_default_without_losing_cache() {
        let mut cache = NotifyCache::new();
        cache.apply(SensorId::Proximity, CacheEvent::Restore, false);
        cache.apply(SensorId::Proximity, CacheEvent::Hub(covered(1)), false);

        let value = cache.apply(SensorId::Proximity, CacheEvent::Forget, false);
        assert_eq!(value, Some(SensorValue::Proximity { covered: false }));

        let value = cache.apply(SensorId::Proximity, CacheEvent::Restore, false);
        assert_eq!(value, Some(SensorValue::Proximity { covered: true }));
    }

    #[test]
    fn reset_drops_cached_sample() {
        let mut cache = NotifyCache::new();
        cache.apply(SensorId::Proximity, CacheEvent::Restore, false);
        cache.apply(SensorId::Proximity, CacheEvent::Hub(covered(1)), false);
        cache.apply(SensorId::Proximity, CacheEvent::Reset, false);

        let value = cache.apply(SensorId::Proximity, CacheEvent::Restore, false);
        assert_eq!(value, Some(SensorValue::Proximity { covered: false }));
    }

    #[test]
    fn exception_window_forces_proximity_covered() {
        let mut cache = NotifyCache::new();
        let value = cache.apply(SensorId::Proximity, CacheEvent::Repeat, true);
        assert_eq!(value, Some(SensorValue::Proximity { covered: true }));
    }

    #[test]
    fn exception_window_does_not_touch_other_sensors() {
        let mut cache = NotifyCache::new();
        let sample = Sample::AmbientLight(AlsSample {
            timestamp: 1,
            lux: 750,
        });
        cache.apply(SensorId::AmbientLight, CacheEvent::Restore, true);
        let value = cache.apply(SensorId::AmbientLight, CacheEvent::Hub(sample), true);
        assert_eq!(value, Some(SensorValue::AmbientLight { lux: 750 }));
    }

    #[test]
    fn kernel_source_shadows_hub_samples() {
        let mut cache = NotifyCache::new();
        cache.mark_kernel_source(SensorId::Proximity);

        assert_eq!(
            cache.apply(SensorId::Proximity, CacheEvent::Hub(covered(1)), false),
            None
        );

        let value = cache.apply(SensorId::Proximity, CacheEvent::Kernel(covered(2)), false);
        assert_eq!(value, Some(SensorValue::Proximity { covered: true }));
    }

    #[test]
    fn kernel_sample_implies_tracking() {
        let mut cache = NotifyCache::new();
        let value = cache.apply(SensorId::Proximity, CacheEvent::Kernel(covered(1)), false);
        assert_eq!(value, Some(SensorValue::Proximity { covered: true }));
    }

    #[test]
    fn internal_sensor_has_no_deliverable_value() {
        let mut cache = NotifyCache::new();
        assert_eq!(
            cache.apply(SensorId::Accelerometer, CacheEvent::Repeat, false),
            None
        );
    }
}
