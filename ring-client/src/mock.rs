//! Scripted in-process mock of the client boundary
//!
//! Deterministic stand-in for the real cloud client: fixtures are installed
//! up front, failures are injected per call site, change streams are pushed
//! by the test, and every state-changing call is recorded so tests can
//! assert exactly which remote traffic happened.
//!
//! Compiled only with the `test-support` feature (or under `cfg(test)`).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::{ClientError, Result};
use crate::model::{
    CameraData, CameraId, DeviceUpdate, LocationId, LocationMode, MotionEvent, Profile,
    RawAlarmMode, TokenUpdate, Zid,
};
use crate::{CameraHandle, Device, LocationHandle, RingClient};

const STREAM_CAPACITY: usize = 64;

/// Queue of injected failures for one call site
///
/// Each `fail_next` arms exactly one future call; calls with an empty queue
/// succeed.
#[derive(Debug, Default)]
struct FailureScript {
    queued: Mutex<VecDeque<ClientError>>,
}

impl FailureScript {
    fn fail_next(&self, error: ClientError) {
        self.queued.lock().push_back(error);
    }

    fn take(&self) -> Option<ClientError> {
        self.queued.lock().pop_front()
    }

    fn check(&self) -> Result<()> {
        match self.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// A state-changing call recorded by [`MockLocation`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    ArmHome { bypass: Vec<Zid> },
    ArmAway { bypass: Vec<Zid> },
    Disarm,
    SetLocationMode(LocationMode),
}

/// Scripted location fixture
pub struct MockLocation {
    id: LocationId,
    name: Mutex<String>,
    devices: Mutex<Vec<Device>>,
    mode: Mutex<RawAlarmMode>,
    update_tx: broadcast::Sender<DeviceUpdate>,
    commands: Mutex<Vec<RecordedCommand>>,
    fail_devices: FailureScript,
    fail_alarm_mode: FailureScript,
    fail_location_mode: FailureScript,
    fail_arm_home: FailureScript,
    fail_arm_away: FailureScript,
    fail_disarm: FailureScript,
    fail_set_location_mode: FailureScript,
}

impl MockLocation {
    pub fn new(id: impl Into<LocationId>, name: impl Into<String>) -> Arc<Self> {
        let (update_tx, _) = broadcast::channel(STREAM_CAPACITY);
        Arc::new(Self {
            id: id.into(),
            name: Mutex::new(name.into()),
            devices: Mutex::new(Vec::new()),
            mode: Mutex::new(RawAlarmMode::None),
            update_tx,
            commands: Mutex::new(Vec::new()),
            fail_devices: FailureScript::default(),
            fail_alarm_mode: FailureScript::default(),
            fail_location_mode: FailureScript::default(),
            fail_arm_home: FailureScript::default(),
            fail_arm_away: FailureScript::default(),
            fail_disarm: FailureScript::default(),
            fail_set_location_mode: FailureScript::default(),
        })
    }

    /// Replace the device fixture list
    pub fn set_devices(&self, devices: Vec<Device>) {
        *self.devices.lock() = devices;
    }

    /// Insert or replace a single device fixture by zid
    pub fn upsert_device(&self, device: Device) {
        let mut devices = self.devices.lock();
        if let Some(existing) = devices.iter_mut().find(|d| d.zid == device.zid) {
            *existing = device;
        } else {
            devices.push(device);
        }
    }

    /// Set the raw mode both reads will report
    pub fn set_mode(&self, mode: RawAlarmMode) {
        *self.mode.lock() = mode;
    }

    /// Push an event onto the device change stream
    ///
    /// Returns the number of live receivers the event reached.
    pub fn push_device_update(&self, update: DeviceUpdate) -> usize {
        self.update_tx.send(update).unwrap_or(0)
    }

    /// Number of receivers currently attached to the update stream
    pub fn update_receiver_count(&self) -> usize {
        self.update_tx.receiver_count()
    }

    /// Every state-changing call issued so far, in order
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.commands.lock().clone()
    }

    pub fn fail_next_devices(&self, error: ClientError) {
        self.fail_devices.fail_next(error);
    }

    pub fn fail_next_alarm_mode(&self, error: ClientError) {
        self.fail_alarm_mode.fail_next(error);
    }

    pub fn fail_next_location_mode(&self, error: ClientError) {
        self.fail_location_mode.fail_next(error);
    }

    pub fn fail_next_arm_home(&self, error: ClientError) {
        self.fail_arm_home.fail_next(error);
    }

    pub fn fail_next_arm_away(&self, error: ClientError) {
        self.fail_arm_away.fail_next(error);
    }

    pub fn fail_next_disarm(&self, error: ClientError) {
        self.fail_disarm.fail_next(error);
    }

    pub fn fail_next_set_location_mode(&self, error: ClientError) {
        self.fail_set_location_mode.fail_next(error);
    }

    fn record(&self, command: RecordedCommand) {
        self.commands.lock().push(command);
    }
}

#[async_trait]
impl LocationHandle for MockLocation {
    fn location_id(&self) -> &LocationId {
        &self.id
    }

    fn name(&self) -> String {
        self.name.lock().clone()
    }

    fn device_updates(&self) -> broadcast::Receiver<DeviceUpdate> {
        self.update_tx.subscribe()
    }

    async fn devices(&self) -> Result<Vec<Device>> {
        self.fail_devices.check()?;
        Ok(self.devices.lock().clone())
    }

    async fn alarm_mode(&self) -> Result<RawAlarmMode> {
        self.fail_alarm_mode.check()?;
        Ok(*self.mode.lock())
    }

    async fn location_mode(&self) -> Result<RawAlarmMode> {
        self.fail_location_mode.check()?;
        Ok(*self.mode.lock())
    }

    async fn arm_home(&self, bypass: &[Zid]) -> Result<()> {
        let outcome = self.fail_arm_home.check();
        self.record(RecordedCommand::ArmHome {
            bypass: bypass.to_vec(),
        });
        outcome?;
        *self.mode.lock() = RawAlarmMode::Some;
        Ok(())
    }

    async fn arm_away(&self, bypass: &[Zid]) -> Result<()> {
        let outcome = self.fail_arm_away.check();
        self.record(RecordedCommand::ArmAway {
            bypass: bypass.to_vec(),
        });
        outcome?;
        *self.mode.lock() = RawAlarmMode::All;
        Ok(())
    }

    async fn disarm(&self) -> Result<()> {
        let outcome = self.fail_disarm.check();
        self.record(RecordedCommand::Disarm);
        outcome?;
        *self.mode.lock() = RawAlarmMode::None;
        Ok(())
    }

    async fn set_location_mode(&self, mode: LocationMode) -> Result<()> {
        let outcome = self.fail_set_location_mode.check();
        self.record(RecordedCommand::SetLocationMode(mode));
        outcome?;
        *self.mode.lock() = match mode {
            LocationMode::Home => RawAlarmMode::Some,
            LocationMode::Away => RawAlarmMode::All,
            LocationMode::Disarmed => RawAlarmMode::None,
        };
        Ok(())
    }
}

/// Scripted camera fixture
pub struct MockCamera {
    id: CameraId,
    location_id: LocationId,
    data: Mutex<CameraData>,
    motion_tx: broadcast::Sender<MotionEvent>,
    snapshot_bytes: Mutex<Vec<u8>>,
    record_bytes: Mutex<Vec<u8>>,
    fail_snapshot: FailureScript,
    fail_record: FailureScript,
    recordings_requested: Mutex<Vec<u64>>,
}

impl MockCamera {
    pub fn new(
        id: impl Into<CameraId>,
        location_id: impl Into<LocationId>,
        name: impl Into<String>,
    ) -> Arc<Self> {
        let id = id.into();
        let (motion_tx, _) = broadcast::channel(STREAM_CAPACITY);
        Arc::new(Self {
            data: Mutex::new(CameraData::new(id.clone(), name)),
            id,
            location_id: location_id.into(),
            motion_tx,
            snapshot_bytes: Mutex::new(b"jpeg-bytes".to_vec()),
            record_bytes: Mutex::new(b"mp4-bytes".to_vec()),
            fail_snapshot: FailureScript::default(),
            fail_record: FailureScript::default(),
            recordings_requested: Mutex::new(Vec::new()),
        })
    }

    /// Replace the static data blob
    pub fn set_data(&self, data: CameraData) {
        *self.data.lock() = data;
    }

    /// Set the bytes the next snapshots return
    pub fn set_snapshot_bytes(&self, bytes: Vec<u8>) {
        *self.snapshot_bytes.lock() = bytes;
    }

    /// Set the bytes the next recordings return
    pub fn set_record_bytes(&self, bytes: Vec<u8>) {
        *self.record_bytes.lock() = bytes;
    }

    /// Push an event onto the motion stream
    pub fn push_motion(&self, motion: MotionEvent) -> usize {
        self.motion_tx.send(motion).unwrap_or(0)
    }

    /// Number of receivers currently attached to the motion stream
    pub fn motion_receiver_count(&self) -> usize {
        self.motion_tx.receiver_count()
    }

    /// Durations passed to `record` so far
    pub fn recordings_requested(&self) -> Vec<u64> {
        self.recordings_requested.lock().clone()
    }

    pub fn fail_next_snapshot(&self, error: ClientError) {
        self.fail_snapshot.fail_next(error);
    }

    pub fn fail_next_record(&self, error: ClientError) {
        self.fail_record.fail_next(error);
    }
}

#[async_trait]
impl CameraHandle for MockCamera {
    fn camera_id(&self) -> &CameraId {
        &self.id
    }

    fn location_id(&self) -> &LocationId {
        &self.location_id
    }

    fn name(&self) -> String {
        self.data.lock().name.clone()
    }

    fn data(&self) -> CameraData {
        self.data.lock().clone()
    }

    fn motion_events(&self) -> broadcast::Receiver<MotionEvent> {
        self.motion_tx.subscribe()
    }

    async fn record(&self, duration_seconds: u64) -> Result<Vec<u8>> {
        self.recordings_requested.lock().push(duration_seconds);
        self.fail_record.check()?;
        Ok(self.record_bytes.lock().clone())
    }

    async fn snapshot(&self) -> Result<Vec<u8>> {
        self.fail_snapshot.check()?;
        Ok(self.snapshot_bytes.lock().clone())
    }
}

/// Scripted client fixture tying locations and cameras together
pub struct MockRingClient {
    locations: Mutex<Vec<Arc<MockLocation>>>,
    cameras: Mutex<Vec<Arc<MockCamera>>>,
    token_tx: broadcast::Sender<TokenUpdate>,
    fail_profile: FailureScript,
    fail_locations: FailureScript,
    fail_cameras: FailureScript,
    disconnected: AtomicBool,
}

impl MockRingClient {
    pub fn new() -> Arc<Self> {
        let (token_tx, _) = broadcast::channel(STREAM_CAPACITY);
        Arc::new(Self {
            locations: Mutex::new(Vec::new()),
            cameras: Mutex::new(Vec::new()),
            token_tx,
            fail_profile: FailureScript::default(),
            fail_locations: FailureScript::default(),
            fail_cameras: FailureScript::default(),
            disconnected: AtomicBool::new(false),
        })
    }

    pub fn add_location(&self, location: Arc<MockLocation>) {
        self.locations.lock().push(location);
    }

    pub fn add_camera(&self, camera: Arc<MockCamera>) {
        self.cameras.lock().push(camera);
    }

    /// Push a rotation event onto the token stream
    pub fn push_token_update(&self, new_token: impl Into<String>) -> usize {
        self.token_tx
            .send(TokenUpdate::new(new_token))
            .unwrap_or(0)
    }

    pub fn fail_next_profile(&self, error: ClientError) {
        self.fail_profile.fail_next(error);
    }

    pub fn fail_next_locations(&self, error: ClientError) {
        self.fail_locations.fail_next(error);
    }

    pub fn fail_next_cameras(&self, error: ClientError) {
        self.fail_cameras.fail_next(error);
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RingClient for MockRingClient {
    async fn profile(&self) -> Result<Profile> {
        self.fail_profile.check()?;
        Ok(Profile {
            account_id: "mock-account".to_string(),
            email: None,
        })
    }

    fn token_updates(&self) -> broadcast::Receiver<TokenUpdate> {
        self.token_tx.subscribe()
    }

    async fn locations(&self) -> Result<Vec<Arc<dyn LocationHandle>>> {
        self.fail_locations.check()?;
        Ok(self
            .locations
            .lock()
            .iter()
            .map(|l| Arc::clone(l) as Arc<dyn LocationHandle>)
            .collect())
    }

    async fn cameras(&self) -> Result<Vec<Arc<dyn CameraHandle>>> {
        self.fail_cameras.check()?;
        Ok(self
            .cameras
            .lock()
            .iter()
            .map(|c| Arc::clone(c) as Arc<dyn CameraHandle>)
            .collect())
    }

    async fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}
