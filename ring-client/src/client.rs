//! Capability-typed traits for the authenticated remote client
//!
//! The bridge never speaks the cloud protocol itself; it drives these traits.
//! A production implementation wraps the real transport, tests use the
//! scripted [`crate::mock::MockRingClient`]. All change streams are
//! broadcast channels: the stream identity is stable for the lifetime of the
//! client, surviving token rotation, so consumers attached before a rotation
//! keep receiving without re-subscribing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::model::{
    CameraData, CameraId, DeviceUpdate, LocationId, LocationMode, MotionEvent, Profile,
    RawAlarmMode, TokenUpdate, Zid,
};
use crate::Device;

/// An authenticated session with the Ring cloud
///
/// At most one live client exists per credential; it is owned by the
/// session manager and shared read-mostly with every attached consumer.
#[async_trait]
pub trait RingClient: Send + Sync {
    /// Liveness probe: a harmless read that forces an early
    /// refresh-or-fail on the credential
    async fn profile(&self) -> Result<Profile>;

    /// Subscribe to refresh-token rotation events
    fn token_updates(&self) -> broadcast::Receiver<TokenUpdate>;

    /// All locations visible to this account
    async fn locations(&self) -> Result<Vec<Arc<dyn LocationHandle>>>;

    /// All cameras visible to this account, across locations
    async fn cameras(&self) -> Result<Vec<Arc<dyn CameraHandle>>>;

    /// Tear down the session; idempotent
    async fn disconnect(&self);
}

/// A remote location: a grouping of devices with its own alarm mode
#[async_trait]
pub trait LocationHandle: Send + Sync {
    fn location_id(&self) -> &LocationId;

    /// Mutable display name, as last fetched
    fn name(&self) -> String;

    /// Subscribe to the location's device change stream
    ///
    /// Events arrive in remote emission order. Each call returns an
    /// independent receiver on the same underlying stream.
    fn device_updates(&self) -> broadcast::Receiver<DeviceUpdate>;

    /// Fetch the current device list with full data blobs
    async fn devices(&self) -> Result<Vec<Device>>;

    /// Primary alarm-mode read
    async fn alarm_mode(&self) -> Result<RawAlarmMode>;

    /// Legacy location-mode read, the fallback when `alarm_mode` fails
    async fn location_mode(&self) -> Result<RawAlarmMode>;

    /// Arm in home/perimeter mode, bypassing the given faulted devices
    async fn arm_home(&self, bypass: &[Zid]) -> Result<()>;

    /// Arm in away mode, bypassing the given faulted devices
    async fn arm_away(&self, bypass: &[Zid]) -> Result<()>;

    /// Disarm the location
    async fn disarm(&self) -> Result<()>;

    /// Legacy mode-set command, the fallback when a primary command fails.
    /// Lower fidelity: no bypass support.
    async fn set_location_mode(&self, mode: LocationMode) -> Result<()>;
}

/// A remote camera
#[async_trait]
pub trait CameraHandle: Send + Sync {
    fn camera_id(&self) -> &CameraId;

    /// The location this camera belongs to
    fn location_id(&self) -> &LocationId;

    fn name(&self) -> String;

    /// Latest-known static data blob. This is a live view, not a snapshot
    /// taken at any particular event time.
    fn data(&self) -> CameraData;

    /// Subscribe to the camera's motion stream
    fn motion_events(&self) -> broadcast::Receiver<MotionEvent>;

    /// Record a bounded-duration clip and return the raw bytes
    async fn record(&self, duration_seconds: u64) -> Result<Vec<u8>>;

    /// Take a single snapshot and return the raw bytes
    async fn snapshot(&self) -> Result<Vec<u8>>;
}
