//! Standby override machine.
//!
//! Keeps the hub-side standby override in sync with whether the sensor
//! should stay powered while the display sleeps. Target changes that arrive
//! while a call is in flight are remembered and replayed once it completes,
//! so at most one override call is ever outstanding.

use sensor_bridge_hub::HubError;
use sensor_bridge_types::SensorId;

use crate::events::{HubCall, Layer, Op};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandbyState {
    Initial,
    Idle,
    /// Override call in flight.
    Setting,
    /// Override enabled on the hub.
    Enabled,
    /// Override disabled on the hub.
    Disabled,
    /// The hub rejected the override. Cleared on the next target change
    /// or hub restart.
    Na,
    /// Call failed; retry timer armed.
    Error,
}

impl std::fmt::Display for StandbyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StandbyState::Initial => "INITIAL",
            StandbyState::Idle => "IDLE",
            StandbyState::Setting => "SETTING",
            StandbyState::Enabled => "ENABLED",
            StandbyState::Disabled => "DISABLED",
            StandbyState::Na => "NA",
            StandbyState::Error => "ERROR",
        })
    }
}

#[derive(Debug)]
pub struct Standby {
    sensor: SensorId,
    state: StandbyState,
    /// Desired override value.
    target: bool,
    /// Value carried by the in-flight call.
    sent: bool,
    /// Target changed while a call was in flight.
    repeat: bool,
}

impl Standby {
    pub fn new(sensor: SensorId) -> Self {
        Self {
            sensor,
            state: StandbyState::Initial,
            target: false,
            sent: false,
            repeat: false,
        }
    }

    pub fn state(&self) -> StandbyState {
        self.state
    }

    fn rethink(&mut self) -> Vec<Op> {
        self.sent = self.target;
        self.repeat = false;
        self.state = StandbyState::Setting;
        vec![
            Op::CancelRetry(Layer::Override),
            Op::Call(Layer::Override, HubCall::SetStandbyOverride(self.target)),
        ]
    }

    fn settled_matches_target(&self) -> bool {
        match self.state {
            StandbyState::Enabled => self.target,
            StandbyState::Disabled => !self.target,
            _ => false,
        }
    }

    /// The connection came up: push the current target to the hub.
    pub fn start(&mut self) -> Vec<Op> {
        match self.state {
            StandbyState::Initial | StandbyState::Idle => self.rethink(),
            _ => Vec::new(),
        }
    }

    pub fn set_target(&mut self, enable: bool) -> Vec<Op> {
        let changed = enable != self.target;
        self.target = enable;
        match self.state {
            StandbyState::Setting => {
                self.repeat = true;
                Vec::new()
            }
            StandbyState::Enabled | StandbyState::Disabled | StandbyState::Na => {
                if self.settled_matches_target() {
                    Vec::new()
                } else {
                    self.rethink()
                }
            }
            // A changed target does not wait out the retry timer.
            StandbyState::Error if changed => self.rethink(),
            // ERROR with the same target waits for its timer;
            // IDLE/INITIAL wait for start().
            _ => Vec::new(),
        }
    }

    pub fn on_reply(&mut self, reply: Result<bool, HubError>) -> Vec<Op> {
        if self.state != StandbyState::Setting {
            return Vec::new();
        }
        match reply {
            Ok(true) => {
                self.state = if self.sent {
                    StandbyState::Enabled
                } else {
                    StandbyState::Disabled
                };
                if self.repeat || self.target != self.sent {
                    self.rethink()
                } else {
                    Vec::new()
                }
            }
            Ok(false) => {
                tracing::debug!(sensor = %self.sensor, "standby override not supported");
                self.state = StandbyState::Na;
                self.repeat = false;
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(sensor = %self.sensor, %err, "standby override call failed");
                self.state = StandbyState::Error;
                vec![Op::ArmRetry(Layer::Override)]
            }
        }
    }

    pub fn on_retry(&mut self) -> Vec<Op> {
        if self.state != StandbyState::Error {
            return Vec::new();
        }
        self.rethink()
    }

    pub fn reset(&mut self) -> Vec<Op> {
        if self.state == StandbyState::Idle {
            return Vec::new();
        }
        self.state = StandbyState::Idle;
        self.repeat = false;
        vec![
            Op::CancelCall(Layer::Override),
            Op::CancelRetry(Layer::Override),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(enable: bool) -> Op {
        Op::Call(Layer::Override, HubCall::SetStandbyOverride(enable))
    }

    #[test]
    fn start_pushes_current_target() {
        let mut standby = Standby::new(SensorId::Proximity);
        standby.set_target(true);
        let ops = standby.start();
        assert_eq!(ops, vec![Op::CancelRetry(Layer::Override), call(true)]);
        assert_eq!(standby.state(), StandbyState::Setting);
    }

    #[test]
    fn accepted_override_settles() {
        let mut standby = Standby::new(SensorId::Proximity);
        standby.set_target(true);
        standby.start();
        assert!(standby.on_reply(Ok(true)).is_empty());
        assert_eq!(standby.state(), StandbyState::Enabled);
    }

    #[test]
    fn target_change_during_flight_replays_once() {
        let mut standby = Standby::new(SensorId::Proximity);
        standby.set_target(true);
        standby.start();
        // Flip while the call is out; nothing new is issued yet.
        assert!(standby.set_target(false).is_empty());
        // Completion of the stale call triggers exactly one follow-up.
        let ops = standby.on_reply(Ok(true));
        assert_eq!(ops, vec![Op::CancelRetry(Layer::Override), call(false)]);
        assert!(standby.on_reply(Ok(true)).is_empty());
        assert_eq!(standby.state(), StandbyState::Disabled);
    }

    #[test]
    fn matching_target_is_a_no_op() {
        let mut standby = Standby::new(SensorId::Proximity);
        standby.set_target(true);
        standby.start();
        standby.on_reply(Ok(true));
        assert!(standby.set_target(true).is_empty());
    }

    #[test]
    fn rejection_parks_in_na_without_retry() {
        let mut standby = Standby::new(SensorId::Proximity);
        standby.set_target(true);
        standby.start();
        assert!(standby.on_reply(Ok(false)).is_empty());
        assert_eq!(standby.state(), StandbyState::Na);
        assert!(standby.on_retry().is_empty());
    }

    #[test]
    fn na_cleared_by_target_change() {
        let mut standby = Standby::new(SensorId::Proximity);
        standby.set_target(true);
        standby.start();
        standby.on_reply(Ok(false));
        let ops = standby.set_target(false);
        assert_eq!(ops, vec![Op::CancelRetry(Layer::Override), call(false)]);
    }

    #[test]
    fn failure_retries_after_timer_when_target_unchanged() {
        let mut standby = Standby::new(SensorId::Proximity);
        standby.set_target(true);
        standby.start();
        let ops = standby.on_reply(Err(HubError::NoReply("timeout".into())));
        assert_eq!(ops, vec![Op::ArmRetry(Layer::Override)]);
        // Same target again: keep waiting for the timer.
        assert!(standby.set_target(true).is_empty());
        let ops = standby.on_retry();
        assert_eq!(ops, vec![Op::CancelRetry(Layer::Override), call(true)]);
    }

    #[test]
    fn error_state_target_change_reissues_immediately() {
        let mut standby = Standby::new(SensorId::Proximity);
        standby.set_target(true);
        standby.start();
        standby.on_reply(Err(HubError::NoReply("timeout".into())));
        // A flipped target cancels the pending retry and calls right away.
        let ops = standby.set_target(false);
        assert_eq!(ops, vec![Op::CancelRetry(Layer::Override), call(false)]);
        assert_eq!(standby.state(), StandbyState::Setting);
        assert!(standby.on_retry().is_empty());
    }

    #[test]
    fn reset_cancels_everything() {
        let mut standby = Standby::new(SensorId::Proximity);
        standby.set_target(true);
        standby.start();
        let ops = standby.reset();
        assert_eq!(
            ops,
            vec![
                Op::CancelCall(Layer::Override),
                Op::CancelRetry(Layer::Override),
            ]
        );
        // Stale reply after reset does nothing.
        assert!(standby.on_reply(Ok(true)).is_empty());
        assert_eq!(standby.state(), StandbyState::Idle);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut standby = Standby::new(SensorId::Proximity);
        standby.start();
        assert!(!standby.reset().is_empty());
        assert!(standby.reset().is_empty());
    }
}
