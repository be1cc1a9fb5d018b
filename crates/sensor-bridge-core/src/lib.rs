//! Sensor bridge core.
//!
//! Tracks an external sensor hub daemon and exposes proximity, ambient
//! light and orientation values to the embedding daemon. Each managed
//! sensor runs a stack of small state machines (plugin, session, data
//! connection, standby override, reporting); a single driver task executes
//! the I/O the machines ask for. Values flow through a per-sensor cache
//! with fallback defaults, so listeners always have something sane even
//! while the hub is down.

pub mod backend;
pub mod bridge;
pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod exception;
#[cfg(feature = "linux")]
pub mod fallback;
pub mod machines;
pub mod module;
pub mod stack;

mod socket;

pub use bridge::NotifyFn;
pub use config::{load_config, BridgeConfig, HubConfig, TimingConfig};
pub use self::core::CoreStatus;
pub use error::BridgeError;
pub use events::{CoreEffect, CoreEvent, HubCall, HubReply, Layer, SocketEvent};
pub use module::{SensorModule, SensorModuleHandle};
pub use stack::StackStatus;
