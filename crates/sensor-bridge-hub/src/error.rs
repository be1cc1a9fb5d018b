//! Hub IPC errors.

use thiserror::Error;

/// IPC-level failures talking to the sensor hub.
///
/// These are all recoverable from the bridge's point of view: the owning
/// state machine enters its ERROR state and retries. Explicit rejections
/// (negative acks) are carried in reply payloads, not here.
#[derive(Debug, Clone, Error)]
pub enum HubError {
    #[error("hub service is not available on the bus")]
    Unavailable,

    #[error("no reply from hub: {0}")]
    NoReply(String),

    #[error("malformed reply from hub: {0}")]
    BadReply(String),

    #[error("hub call failed: {0}")]
    Failed(String),
}
