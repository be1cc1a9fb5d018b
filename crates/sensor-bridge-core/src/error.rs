//! Bridge errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("hub error: {0}")]
    Hub(#[from] sensor_bridge_hub::HubError),

    #[error("wire error: {0}")]
    Wire(#[from] sensor_bridge_wire::WireError),

    #[error("bridge driver has shut down")]
    ChannelClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
