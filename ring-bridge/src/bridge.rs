//! Bridge facade: session, directory, registry and nodes wired together
//!
//! [`RingBridge::start`] runs the whole attach sequence: resolve the
//! credential, open the session, wait on the session-ready latch, snapshot
//! the topology, then spawn the configured nodes over the shared registry.
//! With no usable credential, every configured node presents
//! "no credentials" and no remote call is ever made.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use ring_session::{ClientFactory, CredentialStore, SessionManager, SessionOutcome, SessionState};

use crate::alarm::{AlarmController, CommandOutcome};
use crate::camera::CameraCapture;
use crate::config::{AlarmControllerConfig, CameraCaptureConfig};
use crate::directory::SourceDirectory;
use crate::envelope::Envelope;
use crate::error::Result;
use crate::listener::{
    spawn_alarm_event_listener, spawn_camera_motion_listener, spawn_device_fault_listener,
    spawn_panel_mode_listener, ListenerNode,
};
use crate::registry::SubscriptionRegistry;
use crate::status::{Presentation, Status, StatusReporter};

/// Which nodes the bridge runs
#[derive(Debug, Clone, Default)]
pub struct BridgeConfig {
    /// Bootstrap refresh token for first-time provisioning
    pub bootstrap_token: Option<String>,
    pub panel_mode_listener: bool,
    pub device_fault_listener: bool,
    pub camera_motion_listener: bool,
    pub alarm_event_listener: bool,
    pub alarm_controller: Option<AlarmControllerConfig>,
    pub camera_capture: Option<CameraCaptureConfig>,
}

impl BridgeConfig {
    /// All listeners on, no controller, no capture
    pub fn listeners_only() -> Self {
        Self {
            panel_mode_listener: true,
            device_fault_listener: true,
            camera_motion_listener: true,
            alarm_event_listener: true,
            ..Self::default()
        }
    }

    fn node_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.panel_mode_listener {
            names.push("panel-mode");
        }
        if self.device_fault_listener {
            names.push("device-fault");
        }
        if self.camera_motion_listener {
            names.push("camera-motion");
        }
        if self.alarm_event_listener {
            names.push("alarm-event");
        }
        if self.alarm_controller.is_some() {
            names.push("alarm-mode");
        }
        if self.camera_capture.is_some() {
            names.push("camera");
        }
        names
    }
}

/// The running bridge
pub struct RingBridge {
    session: SessionManager,
    registry: Option<SubscriptionRegistry>,
    listeners: Vec<ListenerNode>,
    alarm: Option<AlarmController>,
    camera: Option<CameraCapture>,
    events_rx: Option<mpsc::UnboundedReceiver<Envelope>>,
    statuses: Vec<(&'static str, watch::Receiver<Status>)>,
}

impl RingBridge {
    /// Initialize the session and attach every configured node
    ///
    /// Blocks until the session resolves out of `Pending` (ready or
    /// no-credential); with a live session it then snapshots the topology
    /// and spawns the nodes.
    pub async fn start(
        store: Arc<dyn CredentialStore>,
        factory: &dyn ClientFactory,
        config: BridgeConfig,
    ) -> Result<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut session = SessionManager::new(store);
        let outcome = session
            .initialize(factory, config.bootstrap_token.as_deref())
            .await?;

        let client = match outcome {
            SessionOutcome::Connected(client) => client,
            SessionOutcome::NoCredential => {
                return Ok(Self::without_session(session, &config, events_rx));
            }
        };

        // attach only after session-ready
        let mut session_watch = session.watch();
        if !session_watch.wait_attached().await.is_ready() {
            return Ok(Self::without_session(session, &config, events_rx));
        }

        let directory = Arc::new(SourceDirectory::snapshot(client.as_ref()).await?);
        let registry = SubscriptionRegistry::new(Arc::clone(&directory));

        let mut listeners = Vec::new();
        if config.panel_mode_listener {
            listeners.push(spawn_panel_mode_listener(
                &registry,
                directory.as_ref(),
                events_tx.clone(),
            )?);
        }
        if config.device_fault_listener {
            listeners.push(spawn_device_fault_listener(
                &registry,
                directory.as_ref(),
                events_tx.clone(),
            )?);
        }
        if config.camera_motion_listener {
            listeners.push(spawn_camera_motion_listener(
                &registry,
                directory.as_ref(),
                events_tx.clone(),
            )?);
        }
        if config.alarm_event_listener {
            listeners.push(spawn_alarm_event_listener(
                &registry,
                directory.as_ref(),
                events_tx.clone(),
            )?);
        }

        let alarm = match config.alarm_controller {
            Some(controller_config) => Some(AlarmController::spawn(
                &registry,
                directory.as_ref(),
                controller_config,
            )?),
            None => None,
        };

        let camera = config.camera_capture.map(|capture_config| {
            let capture = CameraCapture::new(capture_config, directory.as_ref(), events_tx);
            capture.mark_ready();
            capture
        });

        let mut statuses: Vec<(&'static str, watch::Receiver<Status>)> = listeners
            .iter()
            .map(|l| (l.name(), l.status()))
            .collect();
        if let Some(alarm) = &alarm {
            statuses.push(("alarm-mode", alarm.status()));
        }
        if let Some(camera) = &camera {
            statuses.push(("camera", camera.status()));
        }

        tracing::info!(nodes = statuses.len(), "bridge attached");
        Ok(Self {
            session,
            registry: Some(registry),
            listeners,
            alarm,
            camera,
            events_rx: Some(events_rx),
            statuses,
        })
    }

    /// The terminal no-credential shape: every configured node presents
    /// "no credentials" and nothing touches the remote
    fn without_session(
        session: SessionManager,
        config: &BridgeConfig,
        events_rx: mpsc::UnboundedReceiver<Envelope>,
    ) -> Self {
        let statuses = config
            .node_names()
            .into_iter()
            .map(|name| {
                let (_reporter, rx) =
                    StatusReporter::new(Status::from(Presentation::NoCredentials));
                (name, rx)
            })
            .collect();

        Self {
            session,
            registry: None,
            listeners: Vec::new(),
            alarm: None,
            camera: None,
            events_rx: Some(events_rx),
            statuses,
        }
    }

    /// Take the outbound envelope stream; yields `None` once on repeat calls
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<Envelope>> {
        self.events_rx.take()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Status watchers for every configured node
    pub fn statuses(&self) -> &[(&'static str, watch::Receiver<Status>)] {
        &self.statuses
    }

    pub fn node_status(&self, name: &str) -> Option<watch::Receiver<Status>> {
        self.statuses
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, rx)| rx.clone())
    }

    /// Route an inbound command trigger to the alarm controller
    pub async fn set_alarm_mode(&self, intent: &str) -> CommandOutcome {
        match &self.alarm {
            Some(controller) => controller.apply(intent).await,
            None => {
                tracing::warn!(intent, "no alarm controller configured");
                CommandOutcome::Failed
            }
        }
    }

    /// Route an inbound capture trigger to the camera node
    pub async fn capture(&self) {
        if let Some(camera) = &self.camera {
            camera.trigger().await;
        } else {
            tracing::warn!("no camera capture configured");
        }
    }

    /// Tear everything down: nodes first, then the registry, then the
    /// session
    pub async fn shutdown(mut self) {
        for listener in self.listeners.drain(..) {
            listener.shutdown();
        }
        if let Some(alarm) = self.alarm.take() {
            alarm.shutdown();
        }
        if let Some(registry) = self.registry.take() {
            registry.shutdown();
        }
        self.session.shutdown().await;
        tracing::info!("bridge shut down");
    }
}
