use thiserror::Error;

/// Errors surfaced by the remote client boundary
///
/// Every remote call resolves to one of these; callers decide between the
/// fallback path (`Transient`) and credential re-provisioning
/// (`AuthRejected`). Nothing here is ever allowed to propagate as a panic.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The remote rejected the credential; the stored token is no longer valid
    #[error("remote rejected the session credential")]
    AuthRejected,

    /// A read or command failed for a reason that may not recur
    #[error("transient remote failure: {0}")]
    Transient(String),

    /// The session does not support the requested capability
    #[error("capability not supported by this session: {0}")]
    NotSupported(&'static str),

    /// The client has been disconnected
    #[error("client is disconnected")]
    Disconnected,
}

impl ClientError {
    /// Whether the failure invalidates the stored credential
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, ClientError::AuthRejected)
    }
}

/// Result type for remote client operations
pub type Result<T> = std::result::Result<T, ClientError>;
