use thiserror::Error;

use crate::frame::RigidBodyId;

/// Failures at the publish boundary. They are logged and the message is dropped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PublishError {
    #[error("Channel '{topic}' could not be advertised: {reason}")]
    Advertise { topic: String, reason: String },

    #[error("Message on '{topic}' was rejected: {reason}")]
    Rejected { topic: String, reason: String },

    #[error("Transform broadcast for '{child_frame}' failed: {reason}")]
    Broadcast { child_frame: String, reason: String },
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Rigid body {id} is not in the asset registry")]
    UnregisteredAsset { id: RigidBodyId },

    #[error("Malformed frame {frame}: {reason}")]
    MalformedFrame { frame: u32, reason: String },

    #[error("Non-finite position or orientation for '{asset}'")]
    NonFinite { asset: String },

    #[error("Rigid body id {id} registered twice")]
    DuplicateAssetId { id: RigidBodyId },

    #[error("Asset name '{name}' registered twice")]
    DuplicateAssetName { name: String },

    #[error("Invalid asset name '{0}'")]
    InvalidAssetName(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("Logger setup failed: {0}")]
    Logger(#[from] log::SetLoggerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode record: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Failed to decode record: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
