//! Data socket connection machine.
//!
//! Drives the socket handshake and turns raw frame bytes into cache updates.
//! The socket itself lives in the driver; this machine only decides what the
//! bytes mean.

use sensor_bridge_types::SensorId;
use sensor_bridge_wire::{decode_sample, parse_frames, HANDSHAKE_ACK};

use crate::cache::CacheEvent;
use crate::events::{Layer, Op, SocketEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Initial,
    Idle,
    /// Socket connect and handshake write in progress.
    Connecting,
    /// Handshake written; waiting for the ack byte.
    Registering,
    /// Streaming sample frames.
    Connected,
    /// Socket failed; retry timer armed.
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConnectionState::Initial => "INITIAL",
            ConnectionState::Idle => "IDLE",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Registering => "REGISTERING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Error => "ERROR",
        })
    }
}

#[derive(Debug)]
pub struct Connection {
    sensor: SensorId,
    sample_size: usize,
    state: ConnectionState,
}

impl Connection {
    pub fn new(sensor: SensorId, sample_size: usize) -> Self {
        Self {
            sensor,
            sample_size,
            state: ConnectionState::Initial,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn start(&mut self, session_id: i32) -> Vec<Op> {
        match self.state {
            ConnectionState::Initial | ConnectionState::Idle => {
                self.state = ConnectionState::Connecting;
                vec![Op::OpenSocket { session_id }]
            }
            _ => Vec::new(),
        }
    }

    pub fn on_socket(&mut self, event: SocketEvent) -> Vec<Op> {
        match (self.state, event) {
            (ConnectionState::Connecting, SocketEvent::Connected) => {
                self.state = ConnectionState::Registering;
                Vec::new()
            }
            (ConnectionState::Registering, SocketEvent::HandshakeAck(byte)) => {
                if byte == HANDSHAKE_ACK {
                    tracing::debug!(sensor = %self.sensor, "data connection established");
                    self.state = ConnectionState::Connected;
                    vec![Op::StartChildren]
                } else {
                    tracing::warn!(sensor = %self.sensor, byte, "bad handshake ack");
                    self.fail()
                }
            }
            (ConnectionState::Connected, SocketEvent::Data(buf)) => self.on_data(&buf),
            (_, SocketEvent::Eof) => {
                tracing::warn!(sensor = %self.sensor, "data socket closed by hub");
                self.fail()
            }
            (_, SocketEvent::Failed(reason)) => {
                tracing::warn!(sensor = %self.sensor, %reason, "data socket failed");
                self.fail()
            }
            _ => Vec::new(),
        }
    }

    fn on_data(&mut self, buf: &[u8]) -> Vec<Op> {
        let records = match parse_frames(self.sample_size, buf) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(sensor = %self.sensor, %err, "malformed sample frame");
                return self.fail();
            }
        };
        let mut ops = Vec::with_capacity(records.len());
        for record in records {
            match decode_sample(self.sensor, record) {
                Ok(sample) => ops.push(Op::Cache(CacheEvent::Hub(sample))),
                Err(err) => {
                    tracing::warn!(sensor = %self.sensor, %err, "undecodable sample record");
                    return self.fail();
                }
            }
        }
        ops
    }

    fn fail(&mut self) -> Vec<Op> {
        if self.state == ConnectionState::Idle || self.state == ConnectionState::Error {
            return Vec::new();
        }
        self.state = ConnectionState::Error;
        vec![
            Op::CloseSocket,
            Op::ResetChildren,
            Op::ArmRetry(Layer::Connection),
        ]
    }

    pub fn on_retry(&mut self, session_id: i32) -> Vec<Op> {
        if self.state != ConnectionState::Error {
            return Vec::new();
        }
        self.state = ConnectionState::Connecting;
        vec![Op::OpenSocket { session_id }]
    }

    pub fn reset(&mut self) -> Vec<Op> {
        if self.state == ConnectionState::Idle {
            return Vec::new();
        }
        self.state = ConnectionState::Idle;
        vec![
            Op::CloseSocket,
            Op::CancelRetry(Layer::Connection),
            Op::ResetChildren,
        ]
    }
}
