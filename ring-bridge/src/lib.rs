//! # Ring Flow Bridge
//!
//! Event bridge between the Ring home-security cloud and an automation flow
//! runtime: remote device changes go out as topic-addressed envelopes,
//! inbound triggers come back as alarm-mode commands and camera captures.
//!
//! The moving parts, leaf first:
//!
//! - [`SubscriptionRegistry`] — the change-stream multiplexer. One upstream
//!   attach per source, fan-out to subscribers, explicit handles, idempotent
//!   attach and release.
//! - Listener nodes ([`listener`]) — per-kind filters mapping raw updates to
//!   outbound [`Envelope`]s.
//! - [`AlarmController`] — the arm/disarm state machine with fallback reads
//!   and commands, fresh bypass computation, and exactly-once command
//!   completion.
//! - [`CameraCapture`] — video/photo capture on inbound triggers.
//! - [`RingBridge`] — the facade wiring session, topology snapshot,
//!   registry and nodes together with ordered teardown.
//!
//! Everything is single-threaded and event-driven: work only happens in
//! reaction to a remote event, an inbound trigger, or a session signal.

pub mod alarm;
pub mod bridge;
pub mod camera;
pub mod config;
pub mod directory;
pub mod envelope;
pub mod error;
pub mod listener;
pub mod registry;
pub mod status;

pub use alarm::{AlarmController, CommandOutcome, ControllerState};
pub use bridge::{BridgeConfig, RingBridge};
pub use camera::CameraCapture;
pub use config::{AlarmControllerConfig, CameraCaptureConfig, CaptureKind};
pub use directory::SourceDirectory;
pub use envelope::Envelope;
pub use error::{BridgeError, RegistryError, Result};
pub use registry::{
    ChangeEvent, ConsumerId, StreamSource, SubscriptionHandle, SubscriptionId,
    SubscriptionRegistry,
};
pub use status::{Presentation, Status, StatusFill, StatusReporter};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AlarmController, AlarmControllerConfig, BridgeConfig, BridgeError, CameraCapture,
        CameraCaptureConfig, ChangeEvent, CommandOutcome, ConsumerId, ControllerState, Envelope,
        Result, RingBridge, SourceDirectory, Status, StatusFill, StreamSource,
        SubscriptionHandle, SubscriptionRegistry,
    };
}
