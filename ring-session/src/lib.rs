//! # Ring Flow Session
//!
//! Credential and session lifecycle for the ring-flow bridge.
//!
//! The [`SessionManager`] owns the refresh-capable credential and the one
//! authenticated [`ring_client::RingClient`] bound to it. Consumers never
//! touch the credential; they watch the [`SessionSignal`] latch and attach
//! once the session is ready. Token rotations are persisted through the
//! [`CredentialStore`] before readiness becomes observable, and existing
//! change-stream subscriptions survive rotation untouched.

pub mod error;
pub mod manager;
pub mod signal;
pub mod store;

pub use error::{Result, SessionError};
pub use manager::{ClientFactory, SessionManager, SessionOutcome};
pub use signal::{SessionSignal, SessionState, SessionWatch};
pub use store::{CredentialStore, MemoryStore};
