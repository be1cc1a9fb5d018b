//! The IPC boundary to the external sensor hub daemon.
//!
//! This crate defines the [`HubClient`] trait the bridge core drives. The
//! real bus implementation lives with the embedding daemon's IPC plumbing;
//! tests use the scripted [`mock::MockHub`] backend.

use async_trait::async_trait;

pub mod error;
#[cfg(feature = "mock")]
pub mod mock;

pub use error::HubError;

/// A decoded "read current value" reply.
///
/// The hub returns a timestamp plus a method-specific tuple of integers;
/// the backend registry knows how to project `fields` into a typed sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReading {
    pub timestamp: u64,
    pub fields: Vec<i64>,
}

/// Request/reply calls the bridge issues against the sensor hub.
///
/// Every method maps to one bus call. A `false` in a `bool` reply is an
/// explicit rejection by the hub (capability or sensor unsupported), which
/// is distinct from `Err(HubError)` — an IPC-level failure.
#[async_trait]
pub trait HubClient: Send + Sync + 'static {
    /// Look up the current owner of the hub's well-known bus name.
    async fn query_name_owner(&self) -> Result<Option<String>, HubError>;

    /// Ask the hub to load the plugin for the named sensor.
    async fn load_plugin(&self, sensor: &str) -> Result<bool, HubError>;

    /// Request a data session for the named sensor on behalf of `pid`.
    ///
    /// The hub replies `-1` when it does not support the sensor.
    async fn request_session(&self, sensor: &str, pid: u32) -> Result<i32, HubError>;

    /// Toggle the standby-override capability for an open session.
    async fn set_standby_override(
        &self,
        object: &str,
        session_id: i32,
        enable: bool,
    ) -> Result<bool, HubError>;

    /// Start value reporting for an open session.
    async fn start(&self, object: &str, session_id: i32) -> Result<(), HubError>;

    /// Stop value reporting for an open session.
    async fn stop(&self, object: &str, session_id: i32) -> Result<(), HubError>;

    /// Query the sensor's current value via its read method.
    async fn read_value(&self, object: &str, method: &str) -> Result<RawReading, HubError>;
}
