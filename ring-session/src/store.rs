//! Credential persistence
//!
//! The refresh token lives in host-provided, node-scoped key/value storage.
//! The trait is synchronous on purpose: token-rotation persistence must be
//! blocking relative to the session-ready signal, so a crash between
//! rotation and persistence can never leave a superseded token behind.

use parking_lot::Mutex;

/// Node-scoped storage for the one persisted value: the refresh token
///
/// Only the session manager writes through this trait; everything else
/// treats the credential as read-only.
pub trait CredentialStore: Send + Sync {
    /// The currently stored refresh token, if any
    fn load(&self) -> Option<String>;

    /// Persist a new refresh token, replacing any previous one
    fn save(&self, token: &str);

    /// Forget the stored token (confirmed-invalid credential)
    fn clear(&self);
}

/// In-memory store for tests and embedders without durable storage
#[derive(Debug, Default)]
pub struct MemoryStore {
    token: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with a token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Option<String> {
        self.token.lock().clone()
    }

    fn save(&self, token: &str) {
        *self.token.lock() = Some(token.to_string());
    }

    fn clear(&self) {
        *self.token.lock() = None;
    }
}
