//! Data session machine.
//!
//! Requests a session id from the hub. The id doubles as the handshake token
//! on the data socket, so the connection machine cannot start without it.

use sensor_bridge_hub::HubError;
use sensor_bridge_types::SensorId;

use crate::events::{HubCall, Layer, Op};

/// Session id meaning "sensor not supported". Terminal for this hub run.
pub const SESSION_ID_INVALID: i32 = -1;

/// Session id meaning "reply could not be interpreted". Retried.
pub const SESSION_ID_UNKNOWN: i32 = -2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initial,
    Idle,
    /// Session request in flight.
    Requesting,
    /// A usable session id is held; the connection machine is running.
    Active,
    /// The hub reported the sensor unsupported. Terminal until hub restart.
    Invalid,
    /// Request failed; retry timer armed.
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SessionState::Initial => "INITIAL",
            SessionState::Idle => "IDLE",
            SessionState::Requesting => "REQUESTING",
            SessionState::Active => "ACTIVE",
            SessionState::Invalid => "INVALID",
            SessionState::Error => "ERROR",
        })
    }
}

#[derive(Debug)]
pub struct Session {
    sensor: SensorId,
    state: SessionState,
    session_id: i32,
}

impl Session {
    pub fn new(sensor: SensorId) -> Self {
        Self {
            sensor,
            state: SessionState::Initial,
            session_id: SESSION_ID_UNKNOWN,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The granted session id; negative when none is held.
    pub fn session_id(&self) -> i32 {
        self.session_id
    }

    pub fn start(&mut self) -> Vec<Op> {
        match self.state {
            SessionState::Initial | SessionState::Idle => {
                self.state = SessionState::Requesting;
                vec![Op::Call(Layer::Session, HubCall::RequestSession)]
            }
            _ => Vec::new(),
        }
    }

    pub fn on_reply(&mut self, reply: Result<i32, HubError>) -> Vec<Op> {
        if self.state != SessionState::Requesting {
            return Vec::new();
        }
        match reply {
            Ok(SESSION_ID_INVALID) => {
                tracing::warn!(sensor = %self.sensor, "sensor not supported by hub");
                self.state = SessionState::Invalid;
                Vec::new()
            }
            Ok(SESSION_ID_UNKNOWN) => {
                tracing::warn!(sensor = %self.sensor, "uninterpretable session reply");
                self.state = SessionState::Error;
                vec![Op::ArmRetry(Layer::Session)]
            }
            Ok(id) => {
                tracing::debug!(sensor = %self.sensor, session_id = id, "session granted");
                self.session_id = id;
                self.state = SessionState::Active;
                vec![Op::StartConnection]
            }
            Err(err) => {
                tracing::warn!(sensor = %self.sensor, %err, "session request failed");
                self.state = SessionState::Error;
                vec![Op::ArmRetry(Layer::Session)]
            }
        }
    }

    pub fn on_retry(&mut self) -> Vec<Op> {
        if self.state != SessionState::Error {
            return Vec::new();
        }
        self.state = SessionState::Requesting;
        vec![Op::Call(Layer::Session, HubCall::RequestSession)]
    }

    pub fn reset(&mut self) -> Vec<Op> {
        if self.state == SessionState::Idle {
            return Vec::new();
        }
        self.state = SessionState::Idle;
        self.session_id = SESSION_ID_INVALID;
        vec![
            Op::CancelCall(Layer::Session),
            Op::CancelRetry(Layer::Session),
            Op::ResetConnection,
        ]
    }
}
