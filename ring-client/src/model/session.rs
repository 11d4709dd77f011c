//! Session-level types: account profile and token rotation events

use serde::{Deserialize, Serialize};

/// Minimal account profile returned by the liveness probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A refresh-token rotation event from the session's rotation stream
///
/// The remote invalidates the old token when it issues the new one, so the
/// new token must be persisted before anything else observes the rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUpdate {
    pub new_refresh_token: String,
    pub old_refresh_token: Option<String>,
}

impl TokenUpdate {
    pub fn new(new_refresh_token: impl Into<String>) -> Self {
        Self {
            new_refresh_token: new_refresh_token.into(),
            old_refresh_token: None,
        }
    }
}
