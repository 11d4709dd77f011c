//! Event router listener kinds
//!
//! Each listener maps raw change events to zero-or-one outbound envelope.
//! The drop rules are deliberately distinct per kind and must not be
//! merged: the panel-mode listener requires a mode field, the fault
//! listener requires a fault/tamper indicator, the motion listener forwards
//! everything, and the alarm-event listener requires an alarm payload.
//! Listeners never mutate remote state; the envelope send is the only side
//! effect.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use ring_client::{CameraHandle, DeviceType, LocationHandle, LocationId};

use crate::directory::SourceDirectory;
use crate::envelope::{
    alarm_status_topic, camera_motion_topic, device_topic, panel_mode_topic, Envelope,
};
use crate::error::Result;
use crate::registry::{
    ChangeEvent, ConsumerId, StreamSource, SubscriptionHandle, SubscriptionRegistry,
};
use crate::status::{Presentation, Status, StatusReporter};

/// A running listener with its held subscriptions
///
/// Teardown is the leak-critical path: every subscription this node holds
/// is released exactly once in [`ListenerNode::shutdown`].
pub struct ListenerNode {
    name: &'static str,
    registry: SubscriptionRegistry,
    subscriptions: Vec<SubscriptionHandle>,
    tasks: Vec<JoinHandle<()>>,
    status: StatusReporter,
    status_rx: watch::Receiver<Status>,
}

impl ListenerNode {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Watch this node's status surface
    pub fn status(&self) -> watch::Receiver<Status> {
        self.status_rx.clone()
    }

    /// Release every subscription, then stop the routing tasks
    pub fn shutdown(self) {
        for handle in &self.subscriptions {
            self.registry.unsubscribe(handle);
        }
        for task in &self.tasks {
            task.abort();
        }
        tracing::debug!(node = self.name, "listener shut down");
    }
}

fn new_node(name: &'static str, registry: &SubscriptionRegistry) -> ListenerNode {
    let (status, status_rx) = StatusReporter::new(Status::from(Presentation::Pending));
    ListenerNode {
        name,
        registry: registry.clone(),
        subscriptions: Vec::new(),
        tasks: Vec::new(),
        status,
        status_rx,
    }
}

/// Security-panel mode listener
///
/// Forwards only security-panel updates that carry a mode change; the
/// payload is the panel's full current data blob, re-read at forward time.
pub fn spawn_panel_mode_listener(
    registry: &SubscriptionRegistry,
    directory: &SourceDirectory,
    outbound: mpsc::UnboundedSender<Envelope>,
) -> Result<ListenerNode> {
    let mut node = new_node("panel-mode", registry);
    let consumer = ConsumerId::new(node.name);

    for location in directory.locations() {
        let source = StreamSource::DeviceUpdates(location.location_id().clone());
        let (handle, rx) = registry.subscribe(consumer.clone(), source)?;
        node.subscriptions.push(handle);
        node.tasks
            .push(tokio::spawn(run_panel_mode(location, rx, outbound.clone())));
    }

    node.status.publish_presentation(Presentation::Connected);
    Ok(node)
}

async fn run_panel_mode(
    location: Arc<dyn LocationHandle>,
    mut rx: mpsc::UnboundedReceiver<ChangeEvent>,
    outbound: mpsc::UnboundedSender<Envelope>,
) {
    while let Some(event) = rx.recv().await {
        let ChangeEvent::Device {
            location: location_id,
            update,
        } = event
        else {
            continue;
        };
        if update.device_type != DeviceType::SecurityPanel || !update.carries_mode() {
            continue;
        }

        match location.devices().await {
            Ok(devices) => {
                let panel = devices
                    .iter()
                    .find(|d| d.device_type == DeviceType::SecurityPanel);
                if let Some(panel) = panel {
                    let envelope = Envelope::new(
                        panel_mode_topic(&location_id, &update.zid),
                        json!(panel.data),
                    );
                    let _ = outbound.send(envelope);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, location = %location_id, "device read failed");
            }
        }
    }
}

/// Generic device listener
///
/// Forwards only updates that carry a fault or tamper indicator; everything
/// else is dropped, not buffered. The payload is the device's full current
/// data merged with the location id.
pub fn spawn_device_fault_listener(
    registry: &SubscriptionRegistry,
    directory: &SourceDirectory,
    outbound: mpsc::UnboundedSender<Envelope>,
) -> Result<ListenerNode> {
    let mut node = new_node("device-fault", registry);
    let consumer = ConsumerId::new(node.name);

    for location in directory.locations() {
        let source = StreamSource::DeviceUpdates(location.location_id().clone());
        let (handle, rx) = registry.subscribe(consumer.clone(), source)?;
        node.subscriptions.push(handle);
        node.tasks.push(tokio::spawn(run_device_fault(
            location,
            rx,
            outbound.clone(),
        )));
    }

    node.status.publish_presentation(Presentation::Connected);
    Ok(node)
}

async fn run_device_fault(
    location: Arc<dyn LocationHandle>,
    mut rx: mpsc::UnboundedReceiver<ChangeEvent>,
    outbound: mpsc::UnboundedSender<Envelope>,
) {
    while let Some(event) = rx.recv().await {
        let ChangeEvent::Device {
            location: location_id,
            update,
        } = event
        else {
            continue;
        };
        if !update.has_fault_indicator() {
            continue;
        }

        match location.devices().await {
            Ok(devices) => match devices.into_iter().find(|d| d.zid == update.zid) {
                Some(device) => {
                    let payload = with_location_id(json!(device.data), &location_id);
                    let envelope =
                        Envelope::new(device_topic(&location_id, &update.zid), payload);
                    let _ = outbound.send(envelope);
                }
                None => {
                    tracing::warn!(zid = %update.zid, "updated device missing from device list");
                }
            },
            Err(e) => {
                tracing::error!(error = %e, location = %location_id, "device read failed");
            }
        }
    }
}

/// Camera motion listener
///
/// Forwards every motion event, joined with the camera's latest-known
/// static data at forward time — an intentional live join, not a snapshot
/// taken at detection time.
pub fn spawn_camera_motion_listener(
    registry: &SubscriptionRegistry,
    directory: &SourceDirectory,
    outbound: mpsc::UnboundedSender<Envelope>,
) -> Result<ListenerNode> {
    let mut node = new_node("camera-motion", registry);
    let consumer = ConsumerId::new(node.name);

    for camera in directory.cameras() {
        let source = StreamSource::CameraMotion(camera.camera_id().clone());
        let (handle, rx) = registry.subscribe(consumer.clone(), source)?;
        node.subscriptions.push(handle);
        node.tasks.push(tokio::spawn(run_camera_motion(
            camera,
            rx,
            outbound.clone(),
        )));
    }

    node.status.publish_presentation(Presentation::Connected);
    Ok(node)
}

async fn run_camera_motion(
    camera: Arc<dyn CameraHandle>,
    mut rx: mpsc::UnboundedReceiver<ChangeEvent>,
    outbound: mpsc::UnboundedSender<Envelope>,
) {
    while let Some(event) = rx.recv().await {
        let ChangeEvent::Motion {
            location,
            camera: camera_id,
            motion,
        } = event
        else {
            continue;
        };

        let envelope = Envelope::new(
            camera_motion_topic(&location, &camera_id),
            json!({
                "cameraData": camera.data(),
                "motion": motion,
            }),
        );
        let _ = outbound.send(envelope);
    }
}

/// Alarm event listener
///
/// Watches security-panel updates for an alarm payload and forwards it with
/// the faulted devices resolved to their full data blobs.
pub fn spawn_alarm_event_listener(
    registry: &SubscriptionRegistry,
    directory: &SourceDirectory,
    outbound: mpsc::UnboundedSender<Envelope>,
) -> Result<ListenerNode> {
    let mut node = new_node("alarm-event", registry);
    let consumer = ConsumerId::new(node.name);

    for location in directory.locations() {
        let source = StreamSource::DeviceUpdates(location.location_id().clone());
        let (handle, rx) = registry.subscribe(consumer.clone(), source)?;
        node.subscriptions.push(handle);
        node.tasks.push(tokio::spawn(run_alarm_event(
            location,
            rx,
            outbound.clone(),
        )));
    }

    node.status.publish_presentation(Presentation::Connected);
    Ok(node)
}

async fn run_alarm_event(
    location: Arc<dyn LocationHandle>,
    mut rx: mpsc::UnboundedReceiver<ChangeEvent>,
    outbound: mpsc::UnboundedSender<Envelope>,
) {
    while let Some(event) = rx.recv().await {
        let ChangeEvent::Device {
            location: location_id,
            update,
        } = event
        else {
            continue;
        };
        let Some(info) = update.alarm_info else {
            continue;
        };

        match location.devices().await {
            Ok(devices) => {
                let faulted: Vec<_> = devices
                    .iter()
                    .filter(|d| info.faulted_devices.contains(&d.zid))
                    .map(|d| &d.data)
                    .collect();
                let envelope = Envelope::new(
                    alarm_status_topic(&location_id, &update.zid),
                    json!({
                        "locationId": location_id,
                        "locationName": location.name(),
                        "state": info.state,
                        "faultedDevices": faulted,
                    }),
                );
                let _ = outbound.send(envelope);
            }
            Err(e) => {
                tracing::error!(error = %e, location = %location_id, "device read failed");
            }
        }
    }
}

fn with_location_id(mut value: Value, location: &LocationId) -> Value {
    if let Value::Object(map) = &mut value {
        map.insert(
            "locationId".to_string(),
            Value::String(location.to_string()),
        );
    }
    value
}
