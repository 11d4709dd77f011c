use ring_client::{CameraId, ClientError, LocationId};
use ring_session::SessionError;
use thiserror::Error;

use crate::registry::SubscriptionId;

/// Errors from the subscription registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The source names a location the directory does not know
    #[error("unknown location {0}")]
    UnknownLocation(LocationId),

    /// The source names a camera the directory does not know
    #[error("unknown camera {0}")]
    UnknownCamera(CameraId),

    /// The registry has been shut down; no new subscriptions
    #[error("registry is shut down")]
    ShutDown,

    /// Internal handle bookkeeping mismatch
    #[error("subscription {0} not found")]
    NotFound(SubscriptionId),
}

/// Result type for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Errors surfaced by the bridge layer
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("remote client error: {0}")]
    Client(#[from] ClientError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
