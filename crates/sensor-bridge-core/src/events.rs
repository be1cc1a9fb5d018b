//! Event and effect vocabulary shared by the state machines and the driver.
//!
//! The machines are pure: they consume events and return effects, and the
//! driver (`bridge`) owns every timer, task and socket those effects refer
//! to. Three layers of vocabulary exist:
//!
//! * [`Op`] — what a single sensor stack's machines ask of each other and of
//!   the driver, before the stack resolves cascading child transitions.
//! * [`CoreEvent`] / [`CoreEffect`] — the sensor-tagged surface of the whole
//!   core, as seen by the driver.

use std::time::Duration;

use sensor_bridge_hub::{HubError, RawReading};
use sensor_bridge_types::{Sample, SensorId, SensorValue};

use crate::cache::CacheEvent;

/// Which per-sensor state machine an event or effect belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Plugin,
    Session,
    Connection,
    Override,
    Reporting,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Layer::Plugin => "plugin",
            Layer::Session => "session",
            Layer::Connection => "connection",
            Layer::Override => "override",
            Layer::Reporting => "reporting",
        })
    }
}

/// A hub method call a machine wants issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubCall {
    LoadPlugin,
    RequestSession,
    SetStandbyOverride(bool),
    Start,
    Stop,
    ReadValue,
}

/// The reply to a [`HubCall`], routed back to the issuing machine.
#[derive(Debug, Clone)]
pub enum HubReply {
    Load(Result<bool, HubError>),
    Session(Result<i32, HubError>),
    Override(Result<bool, HubError>),
    Ack(Result<(), HubError>),
    Value(Result<RawReading, HubError>),
}

/// Something that happened on a sensor's data socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The stream connected; the session id handshake has been written.
    Connected,
    /// First byte read after the handshake.
    HandshakeAck(u8),
    /// Raw frame bytes read from the stream.
    Data(Vec<u8>),
    /// The hub closed the stream.
    Eof,
    /// Connect or I/O failure.
    Failed(String),
}

/// An input to the core.
#[derive(Debug)]
pub enum CoreEvent {
    /// Reply to the initial hub name-owner query.
    OwnerReply(Result<Option<String>, HubError>),
    /// The hub's bus name changed hands.
    OwnerChanged(Option<String>),
    /// A client asked to enable a sensor.
    Enable(SensorId),
    /// A client asked to disable a sensor.
    Disable(SensorId),
    /// A listener was registered; re-deliver the current value.
    ListenerRegistered(SensorId),
    /// A kernel event device was attached for this sensor.
    EvdevAttached(SensorId),
    /// Sample decoded from an attached kernel event device.
    EvdevSample(Sample),
    /// Reply to a hub call issued for one sensor's machine.
    Reply {
        sensor: SensorId,
        layer: Layer,
        reply: HubReply,
    },
    /// Data socket activity for one sensor.
    Socket {
        sensor: SensorId,
        event: SocketEvent,
    },
    /// A retry timer armed for one sensor's machine fired.
    RetryExpired { sensor: SensorId, layer: Layer },
    /// The proximity exception window timer fired.
    WindowExpired,
}

/// An output of the core, executed by the driver.
#[derive(Debug)]
pub enum CoreEffect {
    /// Issue the initial name-owner query.
    QueryNameOwner,
    /// Issue a hub call on behalf of one sensor's machine.
    HubCall {
        sensor: SensorId,
        layer: Layer,
        call: HubCall,
        session_id: i32,
    },
    /// Abort the in-flight hub call for this machine, if any.
    CancelCall { sensor: SensorId, layer: Layer },
    /// Arm the retry timer for this machine.
    ArmRetry { sensor: SensorId, layer: Layer },
    /// Cancel the retry timer for this machine, if armed.
    CancelRetry { sensor: SensorId, layer: Layer },
    /// Open the data socket for this sensor and run its handshake.
    OpenSocket { sensor: SensorId, session_id: i32 },
    /// Tear down this sensor's data socket, if open.
    CloseSocket { sensor: SensorId },
    /// Arm the proximity exception window timer.
    ArmWindow(Duration),
    /// Cancel the proximity exception window timer, if armed.
    CancelWindow,
    /// Deliver a value to this sensor's listener.
    Notify {
        sensor: SensorId,
        value: SensorValue,
    },
}

/// What one machine asks of its stack.
///
/// Sensor-agnostic: the stack knows which sensor it is. `Start*`/`Reset*`
/// ops cascade to child machines and are resolved inside the stack.
#[derive(Debug, PartialEq)]
pub enum Op {
    Call(Layer, HubCall),
    CancelCall(Layer),
    ArmRetry(Layer),
    CancelRetry(Layer),
    OpenSocket { session_id: i32 },
    CloseSocket,
    Cache(CacheEvent),
    StartSession,
    ResetSession,
    StartConnection,
    ResetConnection,
    StartChildren,
    ResetChildren,
}
