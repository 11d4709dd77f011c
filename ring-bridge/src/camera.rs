//! Camera capture collaborator
//!
//! On each inbound trigger, asks every camera for media according to the
//! configured capture kind: `video` records a bounded-duration clip and
//! forwards the raw bytes; `photo` takes a snapshot and forwards both the
//! raw bytes and a base64 copy; anything else forwards nothing and reports
//! an unknown type. Capture failures become a status update, never a fault.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::json;
use tokio::sync::{mpsc, watch};

use ring_client::CameraHandle;

use crate::config::{CameraCaptureConfig, CaptureKind};
use crate::directory::SourceDirectory;
use crate::envelope::{capture_topic, Envelope};
use crate::status::{Presentation, Status, StatusFill, StatusReporter};

/// A configured capture node over the directory's cameras
pub struct CameraCapture {
    config: CameraCaptureConfig,
    cameras: Vec<Arc<dyn CameraHandle>>,
    status: StatusReporter,
    status_rx: watch::Receiver<Status>,
    outbound: mpsc::UnboundedSender<Envelope>,
}

impl CameraCapture {
    pub fn new(
        config: CameraCaptureConfig,
        directory: &SourceDirectory,
        outbound: mpsc::UnboundedSender<Envelope>,
    ) -> Self {
        let (status, status_rx) = StatusReporter::new(Status::from(Presentation::Pending));
        Self {
            config,
            cameras: directory.cameras(),
            status,
            status_rx,
            outbound,
        }
    }

    /// Called once the session latch fires
    pub fn mark_ready(&self) {
        self.status.publish(Status::new(StatusFill::Green, "ready"));
    }

    /// Watch this node's status surface
    pub fn status(&self) -> watch::Receiver<Status> {
        self.status_rx.clone()
    }

    /// Handle one inbound trigger; resolves once all cameras are done
    pub async fn trigger(&self) {
        match self.config.kind.clone() {
            CaptureKind::Video => {
                for camera in &self.cameras {
                    self.capture_video(camera).await;
                }
            }
            CaptureKind::Photo => {
                for camera in &self.cameras {
                    self.capture_photo(camera).await;
                }
            }
            CaptureKind::Other(kind) => {
                tracing::warn!(%kind, "capture type not recognized; nothing forwarded");
                self.status
                    .publish(Status::new(StatusFill::Yellow, "unknown type"));
            }
        }
    }

    async fn capture_video(&self, camera: &Arc<dyn CameraHandle>) {
        self.status
            .publish(Status::new(StatusFill::Green, "recording video"));

        match camera.record(self.config.video_duration_seconds).await {
            Ok(buffer) => {
                tracing::debug!(
                    camera = %camera.camera_id(),
                    bytes = buffer.len(),
                    "recording finished"
                );
                let envelope = Envelope::new(
                    capture_topic(),
                    json!({
                        "type": "video",
                        "buffer": buffer,
                    }),
                );
                let _ = self.outbound.send(envelope);
                self.status.publish(Status::new(StatusFill::Green, "ready"));
            }
            Err(e) => {
                tracing::error!(camera = %camera.camera_id(), error = %e, "recording failed");
                self.status
                    .publish(Status::new(StatusFill::Red, e.to_string()));
            }
        }
    }

    async fn capture_photo(&self, camera: &Arc<dyn CameraHandle>) {
        self.status
            .publish(Status::new(StatusFill::Green, "taking snapshot"));

        match camera.snapshot().await {
            Ok(buffer) => {
                let encoded = STANDARD.encode(&buffer);
                let envelope = Envelope::new(
                    capture_topic(),
                    json!({
                        "type": "photo",
                        "buffer": buffer,
                        "base64": encoded,
                    }),
                );
                let _ = self.outbound.send(envelope);
                self.status.publish(Status::new(StatusFill::Green, "ready"));
            }
            Err(e) => {
                tracing::error!(camera = %camera.camera_id(), error = %e, "snapshot failed");
                self.status
                    .publish(Status::new(StatusFill::Red, e.to_string()));
            }
        }
    }
}
