//! Reporting machine.
//!
//! Starts or stops the hub-side sample stream to match the desired enable
//! state, and keeps the cache's trust flag in step: samples are only
//! trusted while reporting is meant to be on. After a successful start it
//! reads the current value once, since the stream only carries changes.

use sensor_bridge_hub::HubError;
use sensor_bridge_types::{Sample, SensorId};

use crate::cache::CacheEvent;
use crate::events::{HubCall, Layer, Op};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingState {
    Initial,
    Idle,
    /// Start call in flight.
    Enabling,
    /// Stream running.
    Enabled,
    /// Stop call in flight.
    Disabling,
    /// Stream stopped.
    Disabled,
    /// Call failed; retry timer armed.
    Error,
}

impl std::fmt::Display for ReportingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ReportingState::Initial => "INITIAL",
            ReportingState::Idle => "IDLE",
            ReportingState::Enabling => "ENABLING",
            ReportingState::Enabled => "ENABLED",
            ReportingState::Disabling => "DISABLING",
            ReportingState::Disabled => "DISABLED",
            ReportingState::Error => "ERROR",
        })
    }
}

#[derive(Debug)]
pub struct Reporting {
    sensor: SensorId,
    state: ReportingState,
    /// The sensor exposes a current-value property worth reading on start.
    has_value_query: bool,
    /// Desired reporting state.
    target: bool,
    /// Value carried by the in-flight call.
    sent: bool,
    /// Target changed while a call was in flight.
    repeat: bool,
}

impl Reporting {
    pub fn new(sensor: SensorId, has_value_query: bool) -> Self {
        Self {
            sensor,
            state: ReportingState::Initial,
            has_value_query,
            target: false,
            sent: false,
            repeat: false,
        }
    }

    pub fn state(&self) -> ReportingState {
        self.state
    }

    fn rethink(&mut self) -> Vec<Op> {
        self.sent = self.target;
        self.repeat = false;
        if self.target {
            self.state = ReportingState::Enabling;
            vec![
                Op::CancelRetry(Layer::Reporting),
                Op::Cache(CacheEvent::Restore),
                Op::Call(Layer::Reporting, HubCall::Start),
            ]
        } else {
            self.state = ReportingState::Disabling;
            vec![
                Op::CancelRetry(Layer::Reporting),
                Op::Cache(CacheEvent::Forget),
                Op::Call(Layer::Reporting, HubCall::Stop),
            ]
        }
    }

    fn settled_matches_target(&self) -> bool {
        match self.state {
            ReportingState::Enabled => self.target,
            ReportingState::Disabled => !self.target,
            _ => false,
        }
    }

    /// The connection came up: push the current target to the hub.
    pub fn start(&mut self) -> Vec<Op> {
        match self.state {
            ReportingState::Initial | ReportingState::Idle => self.rethink(),
            _ => Vec::new(),
        }
    }

    pub fn set_target(&mut self, enable: bool) -> Vec<Op> {
        let changed = enable != self.target;
        self.target = enable;
        match self.state {
            ReportingState::Enabling | ReportingState::Disabling => {
                self.repeat = true;
                Vec::new()
            }
            ReportingState::Enabled | ReportingState::Disabled => {
                if self.settled_matches_target() {
                    Vec::new()
                } else {
                    self.rethink()
                }
            }
            // A changed target does not wait out the retry timer.
            ReportingState::Error if changed => self.rethink(),
            // ERROR with the same target waits for its timer;
            // IDLE/INITIAL wait for start().
            _ => Vec::new(),
        }
    }

    pub fn on_ack(&mut self, reply: Result<(), HubError>) -> Vec<Op> {
        let enabling = match self.state {
            ReportingState::Enabling => true,
            ReportingState::Disabling => false,
            _ => return Vec::new(),
        };
        match reply {
            Ok(()) => {
                self.state = if enabling {
                    ReportingState::Enabled
                } else {
                    ReportingState::Disabled
                };
                if self.repeat || self.target != self.sent {
                    return self.rethink();
                }
                if enabling && self.has_value_query {
                    // The stream only reports changes; fetch the baseline.
                    return vec![Op::Call(Layer::Reporting, HubCall::ReadValue)];
                }
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(sensor = %self.sensor, %err, "reporting call failed");
                self.state = ReportingState::Error;
                vec![Op::ArmRetry(Layer::Reporting)]
            }
        }
    }

    /// Reply to the post-start value read, already decoded by the stack.
    pub fn on_value_reply(&mut self, sample: Option<Sample>) -> Vec<Op> {
        if self.state != ReportingState::Enabled {
            return Vec::new();
        }
        match sample {
            Some(sample) => vec![Op::Cache(CacheEvent::Hub(sample))],
            None => {
                tracing::warn!(sensor = %self.sensor, "initial value read failed");
                self.state = ReportingState::Error;
                vec![Op::ArmRetry(Layer::Reporting)]
            }
        }
    }

    pub fn on_retry(&mut self) -> Vec<Op> {
        if self.state != ReportingState::Error {
            return Vec::new();
        }
        self.rethink()
    }

    pub fn reset(&mut self) -> Vec<Op> {
        if self.state == ReportingState::Idle {
            return Vec::new();
        }
        self.state = ReportingState::Idle;
        self.repeat = false;
        vec![
            Op::Cache(CacheEvent::Reset),
            Op::CancelCall(Layer::Reporting),
            Op::CancelRetry(Layer::Reporting),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_call() -> Op {
        Op::Call(Layer::Reporting, HubCall::Start)
    }

    fn stop_call() -> Op {
        Op::Call(Layer::Reporting, HubCall::Stop)
    }

    #[test]
    fn enable_starts_stream_and_reads_baseline() {
        let mut reporting = Reporting::new(SensorId::Proximity, true);
        reporting.set_target(true);
        let ops = reporting.start();
        assert_eq!(
            ops,
            vec![
                Op::CancelRetry(Layer::Reporting),
                Op::Cache(CacheEvent::Restore),
                start_call(),
            ]
        );
        let ops = reporting.on_ack(Ok(()));
        assert_eq!(ops, vec![Op::Call(Layer::Reporting, HubCall::ReadValue)]);
        assert_eq!(reporting.state(), ReportingState::Enabled);
    }

    #[test]
    fn no_baseline_read_without_value_query() {
        let mut reporting = Reporting::new(SensorId::Tap, false);
        reporting.set_target(true);
        reporting.start();
        assert!(reporting.on_ack(Ok(())).is_empty());
        assert_eq!(reporting.state(), ReportingState::Enabled);
    }

    #[test]
    fn start_with_disabled_target_stops_stream() {
        let mut reporting = Reporting::new(SensorId::Proximity, true);
        let ops = reporting.start();
        assert_eq!(
            ops,
            vec![
                Op::CancelRetry(Layer::Reporting),
                Op::Cache(CacheEvent::Forget),
                stop_call(),
            ]
        );
        assert!(reporting.on_ack(Ok(())).is_empty());
        assert_eq!(reporting.state(), ReportingState::Disabled);
    }

    #[test]
    fn enable_then_disable_single_call_in_flight() {
        let mut reporting = Reporting::new(SensorId::Proximity, true);
        reporting.set_target(true);
        reporting.start();
        // Disable while the start call is out.
        assert!(reporting.set_target(false).is_empty());
        let ops = reporting.on_ack(Ok(()));
        assert_eq!(
            ops,
            vec![
                Op::CancelRetry(Layer::Reporting),
                Op::Cache(CacheEvent::Forget),
                stop_call(),
            ]
        );
        assert!(reporting.on_ack(Ok(())).is_empty());
        assert_eq!(reporting.state(), ReportingState::Disabled);
    }

    #[test]
    fn value_reply_caches_sample() {
        let mut reporting = Reporting::new(SensorId::Proximity, true);
        reporting.set_target(true);
        reporting.start();
        reporting.on_ack(Ok(()));
        let sample = Sample::default_for(SensorId::Proximity);
        assert_eq!(
            reporting.on_value_reply(Some(sample)),
            vec![Op::Cache(CacheEvent::Hub(sample))]
        );
    }

    #[test]
    fn failed_value_reply_retries() {
        let mut reporting = Reporting::new(SensorId::Proximity, true);
        reporting.set_target(true);
        reporting.start();
        reporting.on_ack(Ok(()));
        assert_eq!(
            reporting.on_value_reply(None),
            vec![Op::ArmRetry(Layer::Reporting)]
        );
        assert_eq!(reporting.state(), ReportingState::Error);
        let ops = reporting.on_retry();
        assert!(ops.contains(&start_call()));
    }

    #[test]
    fn failed_ack_retries_after_timer_when_target_unchanged() {
        let mut reporting = Reporting::new(SensorId::Proximity, true);
        reporting.set_target(true);
        reporting.start();
        let ops = reporting.on_ack(Err(HubError::NoReply("timeout".into())));
        assert_eq!(ops, vec![Op::ArmRetry(Layer::Reporting)]);
        // Same target again: keep waiting for the timer.
        assert!(reporting.set_target(true).is_empty());
        let ops = reporting.on_retry();
        assert!(ops.contains(&start_call()));
    }

    #[test]
    fn error_state_target_change_reissues_immediately() {
        let mut reporting = Reporting::new(SensorId::Proximity, true);
        reporting.set_target(true);
        reporting.start();
        reporting.on_ack(Err(HubError::NoReply("timeout".into())));
        // A flipped target cancels the pending retry and calls right away.
        let ops = reporting.set_target(false);
        assert_eq!(
            ops,
            vec![
                Op::CancelRetry(Layer::Reporting),
                Op::Cache(CacheEvent::Forget),
                stop_call(),
            ]
        );
        assert_eq!(reporting.state(), ReportingState::Disabling);
        assert!(reporting.on_retry().is_empty());
    }

    #[test]
    fn reset_drops_cache_trust() {
        let mut reporting = Reporting::new(SensorId::Proximity, true);
        reporting.set_target(true);
        reporting.start();
        let ops = reporting.reset();
        assert_eq!(
            ops,
            vec![
                Op::Cache(CacheEvent::Reset),
                Op::CancelCall(Layer::Reporting),
                Op::CancelRetry(Layer::Reporting),
            ]
        );
        // Stale ack is ignored.
        assert!(reporting.on_ack(Ok(())).is_empty());
    }

    #[test]
    fn reset_is_idempotent() {
        let mut reporting = Reporting::new(SensorId::Proximity, true);
        reporting.set_target(true);
        reporting.start();
        assert!(!reporting.reset().is_empty());
        assert!(reporting.reset().is_empty());
    }
}
