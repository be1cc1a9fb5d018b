//! Plugin load machine: the root of a sensor stack.

use sensor_bridge_hub::HubError;
use sensor_bridge_types::SensorId;

use crate::events::{HubCall, Layer, Op};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Initial,
    Idle,
    /// Load request in flight.
    Loading,
    /// The hub accepted the plugin; the session machine is running.
    Loaded,
    /// The hub rejected the plugin. Terminal until the hub restarts.
    Na,
    /// Load failed at the IPC level; retry timer armed.
    Error,
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PluginState::Initial => "INITIAL",
            PluginState::Idle => "IDLE",
            PluginState::Loading => "LOADING",
            PluginState::Loaded => "LOADED",
            PluginState::Na => "NA",
            PluginState::Error => "ERROR",
        })
    }
}

#[derive(Debug)]
pub struct Plugin {
    sensor: SensorId,
    state: PluginState,
}

impl Plugin {
    pub fn new(sensor: SensorId) -> Self {
        Self {
            sensor,
            state: PluginState::Initial,
        }
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    /// The hub is up: ask it to load this sensor's plugin.
    pub fn load(&mut self) -> Vec<Op> {
        match self.state {
            PluginState::Initial | PluginState::Idle => {
                self.state = PluginState::Loading;
                vec![Op::Call(Layer::Plugin, HubCall::LoadPlugin)]
            }
            _ => Vec::new(),
        }
    }

    pub fn on_reply(&mut self, reply: Result<bool, HubError>) -> Vec<Op> {
        if self.state != PluginState::Loading {
            return Vec::new();
        }
        match reply {
            Ok(true) => {
                tracing::debug!(sensor = %self.sensor, "plugin loaded");
                self.state = PluginState::Loaded;
                vec![Op::StartSession]
            }
            Ok(false) => {
                tracing::warn!(sensor = %self.sensor, "plugin not available");
                self.state = PluginState::Na;
                vec![Op::ResetSession]
            }
            Err(err) => {
                tracing::warn!(sensor = %self.sensor, %err, "plugin load failed");
                self.state = PluginState::Error;
                vec![Op::ArmRetry(Layer::Plugin), Op::ResetSession]
            }
        }
    }

    pub fn on_retry(&mut self) -> Vec<Op> {
        if self.state != PluginState::Error {
            return Vec::new();
        }
        self.state = PluginState::Loading;
        vec![Op::Call(Layer::Plugin, HubCall::LoadPlugin)]
    }

    /// The hub went away: drop back to IDLE and tear down below.
    pub fn reset(&mut self) -> Vec<Op> {
        if self.state == PluginState::Idle {
            return Vec::new();
        }
        self.state = PluginState::Idle;
        vec![
            Op::CancelCall(Layer::Plugin),
            Op::CancelRetry(Layer::Plugin),
            Op::ResetSession,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_success_starts_session() {
        let mut plugin = Plugin::new(SensorId::Proximity);
        assert_eq!(
            plugin.load(),
            vec![Op::Call(Layer::Plugin, HubCall::LoadPlugin)]
        );
        assert_eq!(plugin.on_reply(Ok(true)), vec![Op::StartSession]);
        assert_eq!(plugin.state(), PluginState::Loaded);
    }

    #[test]
    fn rejection_is_terminal_na() {
        let mut plugin = Plugin::new(SensorId::Proximity);
        plugin.load();
        assert_eq!(plugin.on_reply(Ok(false)), vec![Op::ResetSession]);
        assert_eq!(plugin.state(), PluginState::Na);
        // No retry from NA.
        assert!(plugin.on_retry().is_empty());
    }

    #[test]
    fn ipc_failure_arms_retry() {
        let mut plugin = Plugin::new(SensorId::Proximity);
        plugin.load();
        let ops = plugin.on_reply(Err(HubError::NoReply("timeout".into())));
        assert_eq!(ops, vec![Op::ArmRetry(Layer::Plugin), Op::ResetSession]);
        assert_eq!(plugin.state(), PluginState::Error);

        assert_eq!(
            plugin.on_retry(),
            vec![Op::Call(Layer::Plugin, HubCall::LoadPlugin)]
        );
        assert_eq!(plugin.state(), PluginState::Loading);
    }

    #[test]
    fn reset_clears_na() {
        let mut plugin = Plugin::new(SensorId::Proximity);
        plugin.load();
        plugin.on_reply(Ok(false));
        plugin.reset();
        assert_eq!(plugin.state(), PluginState::Idle);
        // After a hub restart the plugin may load fine.
        assert_eq!(
            plugin.load(),
            vec![Op::Call(Layer::Plugin, HubCall::LoadPlugin)]
        );
    }

    #[test]
    fn reset_is_idempotent() {
        let mut plugin = Plugin::new(SensorId::Proximity);
        plugin.load();
        assert!(!plugin.reset().is_empty());
        assert!(plugin.reset().is_empty());
    }

    #[test]
    fn stale_reply_ignored_after_reset() {
        let mut plugin = Plugin::new(SensorId::Proximity);
        plugin.load();
        plugin.reset();
        assert!(plugin.on_reply(Ok(true)).is_empty());
        assert_eq!(plugin.state(), PluginState::Idle);
    }
}
