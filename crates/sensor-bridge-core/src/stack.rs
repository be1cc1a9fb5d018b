//! One sensor's machine stack.
//!
//! Owns the five per-sensor machines and resolves the `Start*`/`Reset*`
//! cascades between them, so the core only ever sees flat, driver-facing
//! [`StackEffect`]s.

use std::collections::VecDeque;

use sensor_bridge_types::SensorId;

use crate::backend::{self, SensorBackend};
use crate::cache::CacheEvent;
use crate::events::{HubCall, HubReply, Layer, Op, SocketEvent};
use crate::machines::{
    Connection, ConnectionState, Plugin, PluginState, Reporting, ReportingState, Session,
    SessionState, Standby, StandbyState,
};

/// A driver-facing effect produced by one stack.
#[derive(Debug, PartialEq)]
pub enum StackEffect {
    Call { layer: Layer, call: HubCall },
    CancelCall(Layer),
    ArmRetry(Layer),
    CancelRetry(Layer),
    OpenSocket { session_id: i32 },
    CloseSocket,
    Cache(CacheEvent),
}

#[derive(Debug)]
pub struct SensorStack {
    sensor: SensorId,
    plugin: Plugin,
    session: Session,
    connection: Connection,
    standby: Standby,
    reporting: Reporting,
}

/// Snapshot of one stack's machine states, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackStatus {
    pub plugin: PluginState,
    pub session: SessionState,
    pub session_id: i32,
    pub connection: ConnectionState,
    pub standby: StandbyState,
    pub reporting: ReportingState,
}

impl SensorStack {
    pub fn new(sensor: SensorId) -> Self {
        let backend = backend::backend(sensor);
        Self {
            sensor,
            plugin: Plugin::new(sensor),
            session: Session::new(sensor),
            connection: Connection::new(sensor, backend.sample_size),
            standby: Standby::new(sensor),
            reporting: Reporting::new(sensor, backend.value_method.is_some()),
        }
    }

    pub fn sensor(&self) -> SensorId {
        self.sensor
    }

    pub fn backend(&self) -> &'static SensorBackend {
        backend::backend(self.sensor)
    }

    pub fn session_id(&self) -> i32 {
        self.session.session_id()
    }

    pub fn status(&self) -> StackStatus {
        StackStatus {
            plugin: self.plugin.state(),
            session: self.session.state(),
            session_id: self.session.session_id(),
            connection: self.connection.state(),
            standby: self.standby.state(),
            reporting: self.reporting.state(),
        }
    }

    /// The hub came up: start loading from the root.
    pub fn load(&mut self) -> Vec<StackEffect> {
        let ops = self.plugin.load();
        self.run(ops)
    }

    /// The hub went away: tear the whole stack down.
    pub fn reset(&mut self) -> Vec<StackEffect> {
        let ops = self.plugin.reset();
        self.run(ops)
    }

    /// A client changed whether this sensor should be enabled.
    pub fn set_targets(&mut self, enable: bool) -> Vec<StackEffect> {
        let mut ops = self.standby.set_target(enable);
        ops.extend(self.reporting.set_target(enable));
        self.run(ops)
    }

    /// Route a hub reply to the machine that issued the call.
    pub fn on_reply(&mut self, layer: Layer, reply: HubReply) -> Vec<StackEffect> {
        let ops = match (layer, reply) {
            (Layer::Plugin, HubReply::Load(result)) => self.plugin.on_reply(result),
            (Layer::Session, HubReply::Session(result)) => self.session.on_reply(result),
            (Layer::Override, HubReply::Override(result)) => self.standby.on_reply(result),
            (Layer::Reporting, HubReply::Ack(result)) => self.reporting.on_ack(result),
            (Layer::Reporting, HubReply::Value(result)) => {
                let sample = result
                    .ok()
                    .and_then(|raw| backend::decode_reading(self.sensor, &raw));
                self.reporting.on_value_reply(sample)
            }
            (layer, reply) => {
                tracing::warn!(sensor = %self.sensor, %layer, ?reply, "mismatched hub reply");
                Vec::new()
            }
        };
        self.run(ops)
    }

    pub fn on_socket(&mut self, event: SocketEvent) -> Vec<StackEffect> {
        let ops = self.connection.on_socket(event);
        self.run(ops)
    }

    pub fn on_retry(&mut self, layer: Layer) -> Vec<StackEffect> {
        let ops = match layer {
            Layer::Plugin => self.plugin.on_retry(),
            Layer::Session => self.session.on_retry(),
            Layer::Connection => {
                let session_id = self.session.session_id();
                if session_id < 0 {
                    // The session is gone; its own machinery reconnects.
                    Vec::new()
                } else {
                    self.connection.on_retry(session_id)
                }
            }
            Layer::Override => self.standby.on_retry(),
            Layer::Reporting => self.reporting.on_retry(),
        };
        self.run(ops)
    }

    /// Resolve machine ops, cascading child starts/resets, into flat effects.
    fn run(&mut self, ops: Vec<Op>) -> Vec<StackEffect> {
        let mut queue: VecDeque<Op> = ops.into();
        let mut effects = Vec::new();
        while let Some(op) = queue.pop_front() {
            match op {
                Op::Call(layer, call) => effects.push(StackEffect::Call { layer, call }),
                Op::CancelCall(layer) => effects.push(StackEffect::CancelCall(layer)),
                Op::ArmRetry(layer) => effects.push(StackEffect::ArmRetry(layer)),
                Op::CancelRetry(layer) => effects.push(StackEffect::CancelRetry(layer)),
                Op::OpenSocket { session_id } => {
                    effects.push(StackEffect::OpenSocket { session_id });
                }
                Op::CloseSocket => effects.push(StackEffect::CloseSocket),
                Op::Cache(event) => effects.push(StackEffect::Cache(event)),
                Op::StartSession => queue.extend(self.session.start()),
                Op::ResetSession => queue.extend(self.session.reset()),
                Op::StartConnection => {
                    queue.extend(self.connection.start(self.session.session_id()));
                }
                Op::ResetConnection => queue.extend(self.connection.reset()),
                Op::StartChildren => {
                    queue.extend(self.standby.start());
                    queue.extend(self.reporting.start());
                }
                Op::ResetChildren => {
                    queue.extend(self.standby.reset());
                    queue.extend(self.reporting.reset());
                }
            }
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_bridge_hub::{HubError, RawReading};
    use sensor_bridge_types::Sample;
    use sensor_bridge_wire::HANDSHAKE_ACK;

    fn loaded_stack() -> SensorStack {
        let mut stack = SensorStack::new(SensorId::Proximity);
        stack.set_targets(true);
        let effects = stack.load();
        assert!(effects.contains(&StackEffect::Call {
            layer: Layer::Plugin,
            call: HubCall::LoadPlugin,
        }));
        stack
    }

    fn connected_stack() -> SensorStack {
        let mut stack = loaded_stack();
        stack.on_reply(Layer::Plugin, HubReply::Load(Ok(true)));
        stack.on_reply(Layer::Session, HubReply::Session(Ok(7)));
        stack.on_socket(SocketEvent::Connected);
        stack.on_socket(SocketEvent::HandshakeAck(HANDSHAKE_ACK));
        stack
    }

    #[test]
    fn load_cascades_down_to_socket_open() {
        let mut stack = loaded_stack();
        let effects = stack.on_reply(Layer::Plugin, HubReply::Load(Ok(true)));
        assert_eq!(
            effects,
            vec![StackEffect::Call {
                layer: Layer::Session,
                call: HubCall::RequestSession,
            }]
        );
        let effects = stack.on_reply(Layer::Session, HubReply::Session(Ok(7)));
        assert_eq!(effects, vec![StackEffect::OpenSocket { session_id: 7 }]);
        assert_eq!(stack.session_id(), 7);
    }

    #[test]
    fn handshake_ack_starts_override_and_reporting() {
        let mut stack = connected_stack();
        let status = stack.status();
        assert_eq!(status.connection, ConnectionState::Connected);
        assert_eq!(status.standby, StandbyState::Setting);
        assert_eq!(status.reporting, ReportingState::Enabling);
    }

    #[test]
    fn plugin_failure_resets_whole_stack() {
        let mut stack = connected_stack();
        // Hub restart: reset cascades down, cancelling and closing everything.
        let effects = stack.reset();
        assert!(effects.contains(&StackEffect::CloseSocket));
        assert!(effects.contains(&StackEffect::Cache(CacheEvent::Reset)));
        let status = stack.status();
        assert_eq!(status.plugin, PluginState::Idle);
        assert_eq!(status.session, SessionState::Idle);
        assert_eq!(status.connection, ConnectionState::Idle);
        assert_eq!(status.standby, StandbyState::Idle);
        assert_eq!(status.reporting, ReportingState::Idle);
        assert_eq!(stack.session_id(), -1);
    }

    #[test]
    fn socket_eof_resets_children_and_arms_retry() {
        let mut stack = connected_stack();
        let effects = stack.on_socket(SocketEvent::Eof);
        assert!(effects.contains(&StackEffect::CloseSocket));
        assert!(effects.contains(&StackEffect::ArmRetry(Layer::Connection)));
        assert!(effects.contains(&StackEffect::Cache(CacheEvent::Reset)));

        // Session id is still held, so the retry reconnects.
        let effects = stack.on_retry(Layer::Connection);
        assert_eq!(effects, vec![StackEffect::OpenSocket { session_id: 7 }]);
    }

    #[test]
    fn connection_retry_skipped_without_session() {
        let mut stack = loaded_stack();
        assert!(stack.on_retry(Layer::Connection).is_empty());
    }

    #[test]
    fn value_reply_decodes_through_backend() {
        let mut stack = connected_stack();
        stack.on_reply(Layer::Override, HubReply::Override(Ok(true)));
        stack.on_reply(Layer::Reporting, HubReply::Ack(Ok(())));
        let effects = stack.on_reply(
            Layer::Reporting,
            HubReply::Value(Ok(RawReading {
                timestamp: 5,
                fields: vec![0, 1],
            })),
        );
        let [StackEffect::Cache(CacheEvent::Hub(Sample::Proximity(ps)))] = effects.as_slice()
        else {
            panic!("expected cached sample, got {effects:?}");
        };
        assert!(ps.covered);
    }

    #[test]
    fn undecodable_value_reply_retries() {
        let mut stack = connected_stack();
        stack.on_reply(Layer::Reporting, HubReply::Ack(Ok(())));
        let effects = stack.on_reply(
            Layer::Reporting,
            HubReply::Value(Err(HubError::NoReply("timeout".into()))),
        );
        assert_eq!(effects, vec![StackEffect::ArmRetry(Layer::Reporting)]);
    }

    #[test]
    fn mismatched_reply_is_dropped() {
        let mut stack = loaded_stack();
        assert!(stack
            .on_reply(Layer::Plugin, HubReply::Session(Ok(3)))
            .is_empty());
    }
}
