//! End-to-end bridge scenarios against the scripted mock client
//!
//! These walk the full attach sequence the way an embedding runtime would:
//! credential resolution, session-ready, topology snapshot, node spawn,
//! event routing, command handling, ordered teardown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use ring_bridge::prelude::*;
use ring_bridge::StatusFill;
use ring_client::mock::{MockCamera, MockLocation, MockRingClient};
use ring_client::{
    Device, DeviceData, DeviceType, DeviceUpdate, MotionEvent, RawAlarmMode, RingClient,
};
use ring_session::{ClientFactory, CredentialStore, MemoryStore, SessionState};

struct FixtureFactory {
    client: Arc<MockRingClient>,
    connects: AtomicUsize,
}

impl FixtureFactory {
    fn new(client: Arc<MockRingClient>) -> Self {
        Self {
            client,
            connects: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ClientFactory for FixtureFactory {
    async fn connect(&self, _refresh_token: &str) -> ring_client::Result<Arc<dyn RingClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.client) as Arc<dyn RingClient>)
    }
}

struct Remote {
    client: Arc<MockRingClient>,
    location: Arc<MockLocation>,
    camera: Arc<MockCamera>,
}

fn seeded_remote() -> Remote {
    let client = MockRingClient::new();
    let location = MockLocation::new("loc-1", "Home");

    let mut panel = DeviceData::new("z-panel", "Alarm Panel", DeviceType::SecurityPanel);
    panel.mode = Some(RawAlarmMode::None);
    let mut door = DeviceData::new("z-door", "Front Door", DeviceType::ContactSensor);
    door.faulted = Some(false);
    location.set_devices(vec![Device::from_data(panel), Device::from_data(door)]);

    let camera = MockCamera::new("cam-1", "loc-1", "Driveway");
    client.add_location(Arc::clone(&location));
    client.add_camera(Arc::clone(&camera));

    Remote {
        client,
        location,
        camera,
    }
}

fn full_config() -> BridgeConfig {
    let mut config = BridgeConfig::listeners_only();
    config.alarm_controller = Some(AlarmControllerConfig::new("loc-1", false));
    config.camera_capture = Some(CameraCaptureConfig::photo());
    config
}

#[tokio::test]
async fn no_credential_is_terminal_with_no_remote_calls() {
    let remote = seeded_remote();
    let factory = FixtureFactory::new(Arc::clone(&remote.client));
    let store = Arc::new(MemoryStore::new());

    let mut bridge = RingBridge::start(store, &factory, full_config())
        .await
        .unwrap();

    assert_eq!(bridge.session_state(), SessionState::NoCredential);
    assert_eq!(factory.connects.load(Ordering::SeqCst), 0);

    // every configured node presents no-credentials/red
    assert_eq!(bridge.statuses().len(), 6);
    for (name, status) in bridge.statuses() {
        let status = status.borrow().clone();
        assert_eq!(status.fill, StatusFill::Red, "node {}", name);
        assert_eq!(status.text, "no credentials", "node {}", name);
    }

    // no subscriptions were taken and no events can arrive
    assert_eq!(remote.location.update_receiver_count(), 0);
    let mut events = bridge.take_events().unwrap();
    assert!(events.try_recv().is_err());

    // commands still complete, without remote traffic
    assert_eq!(bridge.set_alarm_mode("arm").await, CommandOutcome::Failed);
    assert!(remote.location.commands().is_empty());

    bridge.shutdown().await;
}

#[tokio::test]
async fn bootstrap_token_provisions_and_attaches() {
    let remote = seeded_remote();
    let factory = FixtureFactory::new(Arc::clone(&remote.client));
    let store = Arc::new(MemoryStore::new());

    let mut config = BridgeConfig::listeners_only();
    config.bootstrap_token = Some("boot-1".to_string());

    let bridge = RingBridge::start(
        Arc::clone(&store) as Arc<dyn CredentialStore>,
        &factory,
        config,
    )
    .await
    .unwrap();

    assert!(matches!(
        bridge.session_state(),
        SessionState::Ready { .. }
    ));
    assert_eq!(store.load(), Some("boot-1".to_string()));
    for (name, status) in bridge.statuses() {
        assert_eq!(status.borrow().text, "connected", "node {}", name);
    }
    bridge.shutdown().await;
}

#[tokio::test]
async fn panel_mode_change_flows_out_as_an_envelope() {
    let remote = seeded_remote();
    let factory = FixtureFactory::new(Arc::clone(&remote.client));
    let store = Arc::new(MemoryStore::with_token("tok"));

    let mut bridge = RingBridge::start(store, &factory, full_config())
        .await
        .unwrap();
    let mut events = bridge.take_events().unwrap();

    let mut update = DeviceUpdate::new("z-panel", DeviceType::SecurityPanel);
    update.mode = Some(RawAlarmMode::Some);
    remote.location.push_device_update(update);

    let envelope = events.recv().await.unwrap();
    assert_eq!(
        envelope.topic,
        "ring/loc-1/security-panel/z-panel/security-mode"
    );
    assert_eq!(envelope.payload["name"], "Alarm Panel");

    // the fault and alarm-event listeners dropped it: nothing else queued
    assert!(events.try_recv().is_err());
    bridge.shutdown().await;
}

#[tokio::test]
async fn camera_motion_flows_out_with_latest_data() {
    let remote = seeded_remote();
    let factory = FixtureFactory::new(Arc::clone(&remote.client));
    let store = Arc::new(MemoryStore::with_token("tok"));

    let mut bridge = RingBridge::start(store, &factory, full_config())
        .await
        .unwrap();
    let mut events = bridge.take_events().unwrap();

    remote.camera.push_motion(MotionEvent::detected());

    let envelope = events.recv().await.unwrap();
    assert_eq!(envelope.topic, "ring/loc-1/camera/cam-1/motion");
    assert_eq!(envelope.payload["motion"]["detected"], true);
    assert_eq!(envelope.payload["cameraData"]["name"], "Driveway");
    bridge.shutdown().await;
}

#[tokio::test]
async fn alarm_command_falls_back_and_completes_once() {
    let remote = seeded_remote();
    let factory = FixtureFactory::new(Arc::clone(&remote.client));
    let store = Arc::new(MemoryStore::with_token("tok"));

    let bridge = RingBridge::start(store, &factory, full_config())
        .await
        .unwrap();

    remote
        .location
        .fail_next_arm_away(ring_client::ClientError::Transient("rejected".into()));
    let outcome = bridge.set_alarm_mode("arm").await;
    assert_eq!(outcome, CommandOutcome::Fallback);

    use ring_client::mock::RecordedCommand;
    use ring_client::LocationMode;
    assert_eq!(
        remote.location.commands(),
        vec![
            RecordedCommand::ArmAway { bypass: vec![] },
            RecordedCommand::SetLocationMode(LocationMode::Away),
        ]
    );

    // the alarm node now renders the armed mode status
    let status = bridge.node_status("alarm-mode").unwrap().borrow().clone();
    assert_eq!(status.text, "Home: arm");
    bridge.shutdown().await;
}

#[tokio::test]
async fn capture_trigger_produces_an_image_envelope() {
    let remote = seeded_remote();
    let factory = FixtureFactory::new(Arc::clone(&remote.client));
    let store = Arc::new(MemoryStore::with_token("tok"));

    let mut bridge = RingBridge::start(store, &factory, full_config())
        .await
        .unwrap();
    let mut events = bridge.take_events().unwrap();

    remote.camera.set_snapshot_bytes(b"jpeg".to_vec());
    bridge.capture().await;

    let envelope = events.recv().await.unwrap();
    assert_eq!(envelope.topic, "image");
    assert_eq!(envelope.payload["type"], "photo");
    assert!(envelope.payload["base64"].is_string());
    bridge.shutdown().await;
}

#[tokio::test]
async fn shutdown_releases_every_remote_stream() {
    let remote = seeded_remote();
    let factory = FixtureFactory::new(Arc::clone(&remote.client));
    let store = Arc::new(MemoryStore::with_token("tok"));

    let bridge = RingBridge::start(store, &factory, full_config())
        .await
        .unwrap();
    assert!(remote.location.update_receiver_count() > 0);
    assert!(remote.camera.motion_receiver_count() > 0);

    bridge.shutdown().await;

    // pump teardown is asynchronous; the receivers must drain to zero
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(1);
    loop {
        let leaked = remote.location.update_receiver_count()
            + remote.camera.motion_receiver_count()
            + usize::from(!remote.client.is_disconnected());
        if leaked == 0 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "remote streams leaked after shutdown"
        );
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn misconfigured_location_reports_choices_and_stays_inert() {
    let remote = seeded_remote();
    let factory = FixtureFactory::new(Arc::clone(&remote.client));
    let store = Arc::new(MemoryStore::with_token("tok"));

    let mut config = BridgeConfig::default();
    config.alarm_controller = Some(AlarmControllerConfig::new("loc-wrong", false));

    let bridge = RingBridge::start(store, &factory, config).await.unwrap();

    let status = bridge.node_status("alarm-mode").unwrap().borrow().clone();
    assert_eq!(status.fill, StatusFill::Red);
    assert_eq!(status.text, "location not found");

    // no reads, no commands
    assert_eq!(bridge.set_alarm_mode("home").await, CommandOutcome::Failed);
    assert!(remote.location.commands().is_empty());
    bridge.shutdown().await;
}
