use ring_client::ClientError;
use thiserror::Error;

/// Errors surfaced by the session layer
///
/// Credential problems are not errors here: `NoCredential` and a cleared
/// token are states published through the session signal, because the
/// failure surface for them is a status update, not a fault.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Opening the session failed for a non-credential reason
    #[error("failed to open session: {0}")]
    Connect(#[source] ClientError),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
