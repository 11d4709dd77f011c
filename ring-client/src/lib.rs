//! # Ring Flow Client
//!
//! Capability-typed boundary to the Ring home-security cloud.
//!
//! This crate does not implement the cloud protocol. It defines the model
//! types and traits the rest of the workspace is written against: a
//! [`RingClient`] session exposing [`LocationHandle`]s and [`CameraHandle`]s
//! with subscribable change streams. A production transport implements the
//! traits; the `test-support` feature ships a scripted [`mock`] for tests.
//!
//! ## Stream identity
//!
//! Change streams are bound to the client instance, not to the credential:
//! a refresh-token rotation does not invalidate receivers that are already
//! attached. Consumers therefore subscribe once and survive rotations.

pub mod client;
pub mod error;
pub mod model;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use client::{CameraHandle, LocationHandle, RingClient};
pub use error::{ClientError, Result};
pub use model::{
    AlarmInfo, AlarmMode, CameraData, CameraId, Device, DeviceData, DeviceType, DeviceUpdate,
    LocationId, LocationMode, MotionEvent, Profile, RawAlarmMode, TokenUpdate, Zid,
};
